use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::RwLock;

use interface::{
    de::{value_bool, value_string},
    signing::{append_query, hmac_sha512_hex, implode_path, sha512_hex},
    Access, BroadRule, Capability, Description, Endpoint, ErrorKind, ErrorTable, ExchangeConfig,
    ExchangeError, ExchangeId, MarketIndex, Params, Timeframe, TradingFeeSchedule,
    TransactionStatus,
};

use crate::request::{Classifier, RawResponse, RestAdapter, SignedRequest};

pub mod parse;
mod private;
mod public;

pub const BASE_URL: &str = "https://api.bittrex.com";
pub const VERSION: &str = "v3";
const ENV_PREFIX: &str = "BITTREX";

pub static DESCRIPTION: Description = Description {
    id: ExchangeId::Bittrex,
    name: "Bittrex",
    countries: &["US"],
    version: VERSION,
    rate_limit: 1500,
    hosts: &[("public", BASE_URL), ("private", BASE_URL)],
    timeframes: &[
        (Timeframe::M1, "MINUTE_1"),
        (Timeframe::M5, "MINUTE_5"),
        (Timeframe::H1, "HOUR_1"),
        (Timeframe::D1, "DAY_1"),
    ],
    fees: TradingFeeSchedule {
        maker: dec!(0.0075),
        taker: dec!(0.0075),
        percentage: true,
        tier_based: true,
    },
    has: &[
        Capability::FetchMarkets,
        Capability::FetchCurrencies,
        Capability::FetchTicker,
        Capability::FetchTickers,
        Capability::FetchBidsAsks,
        Capability::FetchOrderBook,
        Capability::FetchTrades,
        Capability::FetchOhlcv,
        Capability::FetchTime,
        Capability::FetchTradingFee,
        Capability::FetchTradingFees,
        Capability::FetchBalance,
        Capability::CreateOrder,
        Capability::CancelOrder,
        Capability::CancelAllOrders,
        Capability::FetchOrder,
        Capability::FetchOpenOrders,
        Capability::FetchClosedOrders,
        Capability::FetchMyTrades,
        Capability::FetchOrderTrades,
        Capability::FetchDeposit,
        Capability::FetchDeposits,
        Capability::FetchWithdrawal,
        Capability::FetchWithdrawals,
        Capability::FetchDepositAddress,
        Capability::CreateDepositAddress,
        Capability::Withdraw,
    ],
    endpoints: &[
        Endpoint::public("GET", "ping", 1),
        Endpoint::public("GET", "currencies", 1),
        Endpoint::public("GET", "markets", 1),
        Endpoint::public("GET", "markets/tickers", 1),
        Endpoint::public("GET", "markets/summaries", 1),
        Endpoint::public("GET", "markets/{marketSymbol}/summary", 1),
        Endpoint::public("GET", "markets/{marketSymbol}/orderbook", 1),
        Endpoint::public("GET", "markets/{marketSymbol}/trades", 1),
        Endpoint::public("GET", "markets/{marketSymbol}/ticker", 1),
        Endpoint::public("GET", "markets/{marketSymbol}/candles/{candleInterval}/recent", 1),
        Endpoint::public(
            "GET",
            "markets/{marketSymbol}/candles/{candleInterval}/historical/{year}/{month}/{day}",
            1,
        ),
        Endpoint::public(
            "GET",
            "markets/{marketSymbol}/candles/{candleInterval}/historical/{year}/{month}",
            1,
        ),
        Endpoint::public(
            "GET",
            "markets/{marketSymbol}/candles/{candleInterval}/historical/{year}",
            1,
        ),
        Endpoint::private("GET", "account/fees/trading", 1),
        Endpoint::private("GET", "account/fees/trading/{marketSymbol}", 1),
        Endpoint::private("GET", "addresses/{currencySymbol}", 1),
        Endpoint::private("GET", "balances", 1),
        Endpoint::private("GET", "deposits/open", 1),
        Endpoint::private("GET", "deposits/closed", 1),
        Endpoint::private("GET", "deposits/ByTxId/{txId}", 1),
        Endpoint::private("GET", "executions", 1),
        Endpoint::private("GET", "orders/closed", 1),
        Endpoint::private("GET", "orders/open", 1),
        Endpoint::private("GET", "orders/{orderId}", 1),
        Endpoint::private("GET", "orders/{orderId}/executions", 1),
        Endpoint::private("GET", "withdrawals/open", 1),
        Endpoint::private("GET", "withdrawals/closed", 1),
        Endpoint::private("GET", "withdrawals/ByTxId/{txId}", 1),
        Endpoint::private("GET", "conditional-orders/{conditionalOrderId}", 1),
        Endpoint::private("GET", "conditional-orders/closed", 1),
        Endpoint::private("GET", "conditional-orders/open", 1),
        Endpoint::private("POST", "addresses", 1),
        Endpoint::private("POST", "orders", 1),
        Endpoint::private("POST", "withdrawals", 1),
        Endpoint::private("POST", "conditional-orders", 1),
        Endpoint::private("DELETE", "orders/open", 1),
        Endpoint::private("DELETE", "orders/{orderId}", 1),
        Endpoint::private("DELETE", "conditional-orders/{conditionalOrderId}", 1),
    ],
    exact: &[
        ("BAD_REQUEST", ErrorKind::BadRequest),
        ("STARTDATE_OUT_OF_RANGE", ErrorKind::BadRequest),
        ("APISIGN_NOT_PROVIDED", ErrorKind::Authentication),
        ("APIKEY_INVALID", ErrorKind::Authentication),
        ("INVALID_SIGNATURE", ErrorKind::Authentication),
        ("INVALID_CURRENCY", ErrorKind::Exchange),
        ("INVALID_PERMISSION", ErrorKind::Authentication),
        ("INSUFFICIENT_FUNDS", ErrorKind::InsufficientFunds),
        ("INVALID_CEILING_MARKET_BUY", ErrorKind::InvalidOrder),
        ("INVALID_FIAT_ACCOUNT", ErrorKind::InvalidOrder),
        ("INVALID_ORDER_TYPE", ErrorKind::InvalidOrder),
        ("QUANTITY_NOT_PROVIDED", ErrorKind::InvalidOrder),
        ("MIN_TRADE_REQUIREMENT_NOT_MET", ErrorKind::InvalidOrder),
        ("NOT_FOUND", ErrorKind::OrderNotFound),
        ("ORDER_NOT_OPEN", ErrorKind::OrderNotFound),
        ("INVALID_ORDER", ErrorKind::InvalidOrder),
        ("UUID_INVALID", ErrorKind::OrderNotFound),
        ("RATE_NOT_PROVIDED", ErrorKind::InvalidOrder),
        ("INVALID_MARKET", ErrorKind::BadSymbol),
        ("WHITELIST_VIOLATION_IP", ErrorKind::PermissionDenied),
        ("DUST_TRADE_DISALLOWED_MIN_VALUE", ErrorKind::InvalidOrder),
        ("RESTRICTED_MARKET", ErrorKind::BadSymbol),
        (
            "We are down for scheduled maintenance, but we\u{2019}ll be back up shortly.",
            ErrorKind::OnMaintenance,
        ),
    ],
    broad: &[
        BroadRule::new("throttled", ErrorKind::RateLimit),
        BroadRule::new("problem", ErrorKind::ExchangeNotAvailable),
    ],
    common_currencies: &[
        ("BIFI", "Bifrost Finance"),
        ("BTR", "BTRIPS"),
        ("GMT", "GMT Token"),
        ("MEME", "Memetic"),
        ("MER", "Mercury"),
        ("PROS", "Pros.Finance"),
        ("REPV2", "REP"),
        ("TON", "Tokamak Network"),
    ],
};

/// fetch_ticker 가 호출할 엔드포인트
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickerEndpoint {
    /// markets/{marketSymbol}/ticker: last/bid/ask
    #[default]
    Ticker,
    /// markets/{marketSymbol}/summary: high/low/volume/percentChange
    Summary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickersEndpoint {
    #[default]
    Tickers,
    Summaries,
}

#[derive(Debug, Clone)]
pub struct BittrexOptions {
    pub subaccount_id: Option<String>,
    pub ticker_endpoint: TickerEndpoint,
    pub tickers_endpoint: TickersEndpoint,
    /// Pending 이면 deposits/open, 그 외에는 deposits/closed
    pub deposit_status: TransactionStatus,
    pub withdrawal_status: TransactionStatus,
    /// closed orders 응답을 since 로 한 번 더 거른다
    pub closed_orders_filter_by_since: bool,
}

impl Default for BittrexOptions {
    fn default() -> Self {
        Self {
            subaccount_id: None,
            ticker_endpoint: TickerEndpoint::Ticker,
            tickers_endpoint: TickersEndpoint::Tickers,
            deposit_status: TransactionStatus::Ok,
            withdrawal_status: TransactionStatus::Ok,
            closed_orders_filter_by_since: true,
        }
    }
}

/// 환경변수가 설정되어 있는지 확인
pub fn has_api_credentials() -> bool {
    ExchangeConfig::from_env(ENV_PREFIX).has_credentials()
}

/// Bittrex v3 클라이언트
pub struct BittrexClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ExchangeConfig,
    pub(crate) options: BittrexOptions,
    pub(crate) index: RwLock<MarketIndex>,
    pub(crate) errors: ErrorTable,
}

impl BittrexClient {
    /// 공개 API만 사용하는 경우
    pub fn new() -> Self {
        Self::from_parts(reqwest::Client::new(), ExchangeConfig::new())
    }

    /// BITTREX_API_KEY / BITTREX_API_SECRET 으로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let config = ExchangeConfig::from_env(ENV_PREFIX);
        if !config.has_credentials() {
            return Err(ExchangeError::Other(
                "BITTREX_API_KEY or BITTREX_API_SECRET not found".to_string(),
            ));
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = config.http_client()?;
        Ok(Self::from_parts(http, config))
    }

    pub fn with_options(mut self, options: BittrexOptions) -> Self {
        self.options = options;
        self
    }

    fn from_parts(http: reqwest::Client, config: ExchangeConfig) -> Self {
        Self {
            http,
            config,
            options: BittrexOptions::default(),
            index: RwLock::new(MarketIndex::new(
                ExchangeId::Bittrex,
                DESCRIPTION.common_currencies,
            )),
            errors: DESCRIPTION.error_table(),
        }
    }

    fn host(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(BASE_URL)
    }

    pub(crate) async fn request(
        &self,
        method_name: &'static str,
        api: Access,
        verb: Method,
        path: &str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        crate::request::fetch(self, method_name, api, verb, path, params).await
    }
}

impl Default for BittrexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestAdapter for BittrexClient {
    type Api = Access;

    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Bittrex
    }

    fn description(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn access(api: Access) -> Access {
        api
    }

    fn sign(
        &self,
        method_name: &'static str,
        api: Access,
        verb: Method,
        path: &str,
        params: Params,
        nonce: i64,
    ) -> Result<SignedRequest, ExchangeError> {
        let (path, query) = implode_path(path, &params)?;
        let url = format!("{}/{}/{}", self.host(), VERSION, path);
        if api == Access::Public {
            return Ok(SignedRequest::new(verb, append_query(&url, &query)));
        }

        let (api_key, secret) = self.config.credentials(ExchangeId::Bittrex, method_name)?;
        let is_post = verb == Method::POST;
        let (url, body) = if is_post {
            let body = serde_json::to_string(&query)
                .map_err(|e| ExchangeError::Other(format!("Failed to encode body: {}", e)))?;
            (url, body)
        } else {
            (append_query(&url, &query), String::new())
        };

        // POST 가 아니면 빈 문자열의 해시
        let content_hash = sha512_hex(&body);
        let timestamp = nonce.to_string();
        let mut auth = format!("{}{}{}{}", timestamp, url, verb.as_str(), content_hash);
        if let Some(subaccount_id) = &self.options.subaccount_id {
            auth.push_str(subaccount_id);
        }
        let signature = hmac_sha512_hex(secret, &auth)?;

        let mut request = SignedRequest::new(verb, url)
            .header("Api-Key", api_key)
            .header("Api-Timestamp", timestamp)
            .header("Api-Content-Hash", content_hash)
            .header("Api-Signature", signature);
        if let Some(subaccount_id) = &self.options.subaccount_id {
            request = request.header("Api-Subaccount-Id", subaccount_id.clone());
        }
        if is_post {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }
        Ok(request)
    }

    fn handle_errors(
        &self,
        method_name: &'static str,
        response: &RawResponse,
    ) -> Result<(), ExchangeError> {
        let Some(Value::Object(body)) = &response.json else {
            return Ok(());
        };
        let c = Classifier::new(&self.errors, ExchangeId::Bittrex, method_name, &response.body);

        let Some(success) = body.get("success") else {
            let Some(code) = body.get("code").and_then(value_string) else {
                return Ok(());
            };
            if code == "NOT_FOUND" && response.url.contains("addresses") {
                return Err(c.error(ErrorKind::InvalidAddress));
            }
            c.exact(&code)?;
            c.broad(&code)?;
            return Err(c.generic());
        };

        // "true"/"false" 문자열로 오기도 한다
        if value_bool(success).unwrap_or(false) {
            return Ok(());
        }
        let message = body.get("message").and_then(value_string);
        if let Some(message) = message.as_deref() {
            if message == "INVALID_ORDER" && response.url.contains("cancel") {
                return Err(c.error(ErrorKind::OrderNotFound));
            }
            c.exact(message)?;
            c.broad(message)?;
        }
        Err(c.generic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{params, raw_response};
    use serde_json::json;

    fn signed_client() -> BittrexClient {
        BittrexClient::with_config(
            ExchangeConfig::new()
                .with_api_key("test-key")
                .with_secret("test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_public_sign_has_no_auth_headers() {
        let client = BittrexClient::new();
        let request = client
            .sign(
                "fetch_order_book",
                Access::Public,
                Method::GET,
                "markets/{marketSymbol}/orderbook",
                params(json!({"marketSymbol": "ETH-BTC", "depth": 25})),
                0,
            )
            .unwrap();
        assert_eq!(
            request.url,
            "https://api.bittrex.com/v3/markets/ETH-BTC/orderbook?depth=25"
        );
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_private_sign_requires_credentials() {
        let client = BittrexClient::new();
        let err = client
            .sign(
                "fetch_balance",
                Access::Private,
                Method::GET,
                "balances",
                Params::new(),
                1,
            )
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_private_sign_deterministic() {
        let client = signed_client();
        let build = || {
            client
                .sign(
                    "create_order",
                    Access::Private,
                    Method::POST,
                    "orders",
                    params(json!({"marketSymbol": "ETH-BTC", "direction": "BUY"})),
                    1_700_000_000_000,
                )
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a, b);

        let body = a.body.clone().unwrap();
        assert_eq!(body, r#"{"direction":"BUY","marketSymbol":"ETH-BTC"}"#);
        assert_eq!(a.header_value("Api-Content-Hash"), Some(sha512_hex(&body).as_str()));
        let auth = format!(
            "1700000000000https://api.bittrex.com/v3/ordersPOST{}",
            sha512_hex(&body)
        );
        assert_eq!(
            a.header_value("Api-Signature"),
            Some(hmac_sha512_hex("test-secret", &auth).unwrap().as_str())
        );
        assert_eq!(a.header_value("Api-Timestamp"), Some("1700000000000"));
        assert_eq!(a.header_value("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_get_sign_hashes_empty_body() {
        let client = signed_client().with_options(BittrexOptions {
            subaccount_id: Some("sub-1".into()),
            ..Default::default()
        });
        let request = client
            .sign(
                "fetch_open_orders",
                Access::Private,
                Method::GET,
                "orders/open",
                params(json!({"marketSymbol": "ETH-BTC"})),
                5,
            )
            .unwrap();
        assert_eq!(request.body, None);
        assert_eq!(
            request.url,
            "https://api.bittrex.com/v3/orders/open?marketSymbol=ETH-BTC"
        );
        assert_eq!(request.header_value("Api-Content-Hash"), Some(sha512_hex("").as_str()));
        assert_eq!(request.header_value("Api-Subaccount-Id"), Some("sub-1"));
    }

    fn classify(status: u16, url: &str, body: &str) -> Result<(), ExchangeError> {
        BittrexClient::new().handle_errors("test", &raw_response(status, url, body))
    }

    #[test]
    fn test_success_false_insufficient_funds() {
        let err = classify(
            200,
            "https://api.bittrex.com/v3/orders",
            r#"{"success":false,"message":"INSUFFICIENT_FUNDS"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientFunds));
        assert!(err.message().unwrap().contains("INSUFFICIENT_FUNDS"));
    }

    #[test]
    fn test_success_string_false() {
        let err = classify(
            200,
            "https://api.bittrex.com/v3/orders",
            r#"{"success":"false","message":"INVALID_MARKET"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadSymbol));
        assert!(classify(200, "https://x", r#"{"success":"true"}"#).is_ok());
    }

    #[test]
    fn test_unknown_code_is_generic() {
        let err = classify(
            400,
            "https://api.bittrex.com/v3/orders",
            r#"{"code":"UNKNOWN_CODE_123"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Exchange));
    }

    #[test]
    fn test_code_table_and_address_not_found() {
        let err = classify(400, "https://x/v3/orders", r#"{"code":"MIN_TRADE_REQUIREMENT_NOT_MET"}"#)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOrder));

        let err = classify(404, "https://x/v3/addresses/BTC", r#"{"code":"NOT_FOUND"}"#).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidAddress));

        let err = classify(404, "https://x/v3/orders/1", r#"{"code":"NOT_FOUND"}"#).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::OrderNotFound));
    }

    #[test]
    fn test_broad_throttled() {
        let err = classify(
            200,
            "https://x",
            r#"{"success":false,"message":"Call to GetBalances was throttled. Try again in 60 seconds."}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::RateLimit));
    }

    #[test]
    fn test_non_object_bodies_pass() {
        assert!(classify(200, "https://x", r#"[{"symbol":"ETH-BTC"}]"#).is_ok());
        assert!(classify(502, "https://x", "<html>bad gateway</html>").is_ok());
    }
}
