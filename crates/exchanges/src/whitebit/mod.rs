use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use interface::{
    de::{value_i64, value_string},
    signing::{append_query, base64_encode, hmac_sha512_hex, implode_path},
    Access, BroadRule, Capability, Description, Endpoint, ErrorKind, ErrorTable, ExchangeConfig,
    ExchangeError, ExchangeId, MarketIndex, Params, Timeframe, TradingFeeSchedule,
};

use crate::request::{Classifier, RawResponse, RestAdapter, SignedRequest};

pub mod parse;
mod private;
mod public;

pub const BASE_URL: &str = "https://whitebit.com";
const ENV_PREFIX: &str = "WHITEBIT";

pub static DESCRIPTION: Description = Description {
    id: ExchangeId::Whitebit,
    name: "WhiteBit",
    countries: &["EE"],
    version: "v4",
    rate_limit: 500,
    hosts: &[
        ("v1", "https://whitebit.com/api/v1"),
        ("v2", "https://whitebit.com/api/v2"),
        ("v4", "https://whitebit.com/api/v4"),
    ],
    timeframes: &[
        (Timeframe::M1, "1m"),
        (Timeframe::M3, "3m"),
        (Timeframe::M5, "5m"),
        (Timeframe::M15, "15m"),
        (Timeframe::M30, "30m"),
        (Timeframe::H1, "1h"),
        (Timeframe::H2, "2h"),
        (Timeframe::H4, "4h"),
        (Timeframe::H6, "6h"),
        (Timeframe::H8, "8h"),
        (Timeframe::H12, "12h"),
        (Timeframe::D1, "1d"),
        (Timeframe::D3, "3d"),
        (Timeframe::W1, "1w"),
        (Timeframe::Mo1, "1M"),
    ],
    fees: TradingFeeSchedule {
        maker: dec!(0.001),
        taker: dec!(0.001),
        percentage: true,
        tier_based: false,
    },
    has: &[
        Capability::FetchMarkets,
        Capability::FetchCurrencies,
        Capability::FetchTicker,
        Capability::FetchTickers,
        Capability::FetchOrderBook,
        Capability::FetchTrades,
        Capability::FetchOhlcv,
        Capability::FetchTime,
        Capability::FetchStatus,
        Capability::FetchTradingFees,
        Capability::FetchBalance,
        Capability::CreateOrder,
        Capability::CancelOrder,
        Capability::FetchOpenOrders,
        Capability::FetchClosedOrders,
        Capability::FetchMyTrades,
        Capability::FetchOrderTrades,
        Capability::FetchDeposit,
        Capability::FetchDeposits,
        Capability::FetchWithdrawals,
        Capability::FetchDepositAddress,
        Capability::Withdraw,
    ],
    // 같은 path 가 버전마다 있어 weight 조회는 첫 항목을 쓴다
    endpoints: &[
        Endpoint::public("GET", "ticker", 1),
        Endpoint::public("GET", "kline", 1),
        Endpoint::public("GET", "assets", 1),
        Endpoint::public("GET", "fee", 1),
        Endpoint::public("GET", "markets", 1),
        Endpoint::public("GET", "orderbook/{market}", 1),
        Endpoint::public("GET", "trades/{market}", 1),
        Endpoint::public("GET", "time", 1),
        Endpoint::public("GET", "ping", 1),
        Endpoint::private("POST", "trade-account/balance", 1),
        Endpoint::private("POST", "main-account/balance", 1),
        Endpoint::private("POST", "main-account/address", 1),
        Endpoint::private("POST", "main-account/history", 1),
        Endpoint::private("POST", "main-account/withdraw", 1),
        Endpoint::private("POST", "trade-account/executed-history", 1),
        Endpoint::private("POST", "trade-account/order", 1),
        Endpoint::private("POST", "trade-account/order/history", 1),
        Endpoint::private("POST", "order/new", 1),
        Endpoint::private("POST", "order/stock_market", 1),
        Endpoint::private("POST", "order/stop_limit", 1),
        Endpoint::private("POST", "order/stop_market", 1),
        Endpoint::private("POST", "order/cancel", 1),
        Endpoint::private("POST", "orders", 1),
    ],
    exact: &[
        ("Unauthorized request.", ErrorKind::Authentication),
        ("The market format is invalid.", ErrorKind::BadSymbol),
        ("Market is not available", ErrorKind::BadSymbol),
        ("Invalid payload.", ErrorKind::BadRequest),
        ("Amount must be greater than 0", ErrorKind::InvalidOrder),
        ("Not enough balance.", ErrorKind::InsufficientFunds),
        ("The order id field is required.", ErrorKind::InvalidOrder),
        ("Not enough balance", ErrorKind::InsufficientFunds),
        ("This action is unauthorized.", ErrorKind::PermissionDenied),
        ("This API Key is not authorized to perform this action.", ErrorKind::PermissionDenied),
        ("Unexecuted order was not found.", ErrorKind::OrderNotFound),
        ("The selected from is invalid.", ErrorKind::BadRequest),
        ("503", ErrorKind::ExchangeNotAvailable),
        ("422", ErrorKind::OrderNotFound),
    ],
    broad: &[
        BroadRule::new("Given amount is less than min amount", ErrorKind::InvalidOrder),
        BroadRule::new("Total is less than", ErrorKind::InvalidOrder),
        BroadRule::new("fee must be no less than", ErrorKind::InvalidOrder),
        BroadRule::new("Enable your key in API settings", ErrorKind::PermissionDenied),
        BroadRule::new("You don't have such amount for transfer", ErrorKind::InsufficientFunds),
    ],
    common_currencies: &[],
};

/// API 버전과 공개 여부. v1/v2 는 공개 엔드포인트만 쓴다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitebitApi {
    V1Public,
    V2Public,
    V4Public,
    V4Private,
}

impl WhitebitApi {
    pub fn version(&self) -> &'static str {
        match self {
            WhitebitApi::V1Public => "v1",
            WhitebitApi::V2Public => "v2",
            WhitebitApi::V4Public | WhitebitApi::V4Private => "v4",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            WhitebitApi::V4Private => Access::Private,
            _ => Access::Public,
        }
    }
}

/// fetch_balance 가 읽을 계정
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BalanceAccount {
    /// 입출금 계정
    Main,
    #[default]
    Trade,
}

#[derive(Debug, Clone)]
pub struct WhitebitOptions {
    pub balance_account: BalanceAccount,
    /// 있으면 client order id 를 이 접두어 + 임의 16자로 채운다
    pub broker_id: Option<String>,
    /// 입금 주소 대신 결제 URL 을 쓰는 법정화폐
    pub fiat_currencies: Vec<String>,
}

impl Default for WhitebitOptions {
    fn default() -> Self {
        Self {
            balance_account: BalanceAccount::Trade,
            broker_id: None,
            fiat_currencies: ["EUR", "USD", "RUB", "UAH"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl WhitebitOptions {
    pub fn is_fiat(&self, code: &str) -> bool {
        self.fiat_currencies.iter().any(|c| c == code)
    }
}

pub fn has_api_credentials() -> bool {
    ExchangeConfig::from_env(ENV_PREFIX).has_credentials()
}

/// WhiteBIT v1/v2/v4 클라이언트 (현물)
pub struct WhitebitClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ExchangeConfig,
    pub(crate) options: WhitebitOptions,
    pub(crate) index: RwLock<MarketIndex>,
    pub(crate) errors: ErrorTable,
}

impl WhitebitClient {
    pub fn new() -> Self {
        Self::from_parts(reqwest::Client::new(), ExchangeConfig::new())
    }

    /// WHITEBIT_API_KEY / WHITEBIT_API_SECRET 으로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let config = ExchangeConfig::from_env(ENV_PREFIX);
        if !config.has_credentials() {
            return Err(ExchangeError::Other(
                "WHITEBIT_API_KEY or WHITEBIT_API_SECRET not found".to_string(),
            ));
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = config.http_client()?;
        Ok(Self::from_parts(http, config))
    }

    pub fn with_options(mut self, options: WhitebitOptions) -> Self {
        self.options = options;
        self
    }

    fn from_parts(http: reqwest::Client, config: ExchangeConfig) -> Self {
        Self {
            http,
            config,
            options: WhitebitOptions::default(),
            index: RwLock::new(MarketIndex::new(
                ExchangeId::Whitebit,
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
        api: WhitebitApi,
        verb: Method,
        path: &str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        crate::request::fetch(self, method_name, api, verb, path, params).await
    }
}

impl Default for WhitebitClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestAdapter for WhitebitClient {
    type Api = WhitebitApi;

    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Whitebit
    }

    fn description(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn access(api: WhitebitApi) -> Access {
        api.access()
    }

    /// 비공개 요청은 {request, nonce, ...params} JSON 본문의 base64 를 HMAC-SHA512 로 서명한다
    fn sign(
        &self,
        method_name: &'static str,
        api: WhitebitApi,
        verb: Method,
        path: &str,
        params: Params,
        nonce: i64,
    ) -> Result<SignedRequest, ExchangeError> {
        let (imploded, query) = implode_path(path, &params)?;
        let version = api.version();
        if api.access() == Access::Public {
            let url = format!("{}/api/{}/public/{}", self.host(), version, imploded);
            return Ok(SignedRequest::new(verb, append_query(&url, &query)));
        }

        let (api_key, secret) = self.config.credentials(ExchangeId::Whitebit, method_name)?;
        let request_path = format!("/api/{}/{}", version, imploded);
        let mut body = params;
        body.insert("request".into(), json!(request_path));
        body.insert("nonce".into(), json!(nonce.to_string()));
        let body = serde_json::to_string(&body)
            .map_err(|e| ExchangeError::Other(format!("Failed to encode body: {}", e)))?;
        let payload = base64_encode(&body);
        let signature = hmac_sha512_hex(secret, &payload)?;
        Ok(SignedRequest::new(verb, format!("{}{}", self.host(), request_path))
            .header("Content-Type", "application/json")
            .header("X-TXC-APIKEY", api_key)
            .header("X-TXC-PAYLOAD", payload)
            .header("X-TXC-SIGNATURE", signature)
            .body(body))
    }

    /// 에러 응답은 {"code", "message", "errors"} 또는 {"status", "errors", "warning"}
    fn handle_errors(
        &self,
        method_name: &'static str,
        response: &RawResponse,
    ) -> Result<(), ExchangeError> {
        let c = Classifier::new(&self.errors, ExchangeId::Whitebit, method_name, &response.body);
        match response.status {
            418 | 429 => return Err(c.error(ErrorKind::RateLimit)),
            404 => {
                return Err(ExchangeError::new(
                    ErrorKind::Exchange,
                    ExchangeId::Whitebit,
                    method_name,
                    format!("{} 404 endpoint not found", ExchangeId::Whitebit),
                ))
            }
            _ => {}
        }
        let Some(Value::Object(body)) = &response.json else {
            return Ok(());
        };
        let status = body.get("status").and_then(value_string);
        let error_status = status.filter(|s| s != "200");
        let code = body.get("code").and_then(value_i64);
        if error_status.is_none() && code.is_none() {
            return Ok(());
        }
        let info = match error_status {
            Some(status) => Some(status),
            None => match body.get("errors").and_then(Value::as_object) {
                Some(errors) => Some(first_error(errors).unwrap_or_else(|| response.body.clone())),
                None => body.get("message").and_then(value_string),
            },
        };
        if let Some(info) = info {
            c.exact(&info)?;
        }
        c.broad(&response.body)?;
        Err(c.generic())
    }
}

/// errors 의 첫 필드의 첫 메시지
fn first_error(errors: &serde_json::Map<String, Value>) -> Option<String> {
    errors
        .values()
        .next()
        .and_then(Value::as_array)
        .and_then(|messages| messages.first())
        .and_then(value_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{params, raw_response};

    fn signed_client() -> WhitebitClient {
        WhitebitClient::with_config(
            ExchangeConfig::new()
                .with_api_key("key")
                .with_secret("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_public_urls_by_version() {
        let client = WhitebitClient::new();
        let request = client
            .sign(
                "fetch_ohlcv",
                WhitebitApi::V1Public,
                Method::GET,
                "kline",
                params(json!({"market": "BTC_USDT", "interval": "1h"})),
                0,
            )
            .unwrap();
        assert_eq!(
            request.url,
            "https://whitebit.com/api/v1/public/kline?interval=1h&market=BTC_USDT"
        );
        let request = client
            .sign(
                "fetch_order_book",
                WhitebitApi::V4Public,
                Method::GET,
                "orderbook/{market}",
                params(json!({"market": "BTC_USDT"})),
                0,
            )
            .unwrap();
        assert_eq!(request.url, "https://whitebit.com/api/v4/public/orderbook/BTC_USDT");
    }

    #[test]
    fn test_private_sign_payload() {
        let request = signed_client()
            .sign(
                "cancel_order",
                WhitebitApi::V4Private,
                Method::POST,
                "order/cancel",
                params(json!({"market": "BTC_USDT", "orderId": 42})),
                1_700_000_000_000,
            )
            .unwrap();
        assert_eq!(request.url, "https://whitebit.com/api/v4/order/cancel");
        let body = request.body.clone().unwrap();
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["request"], "/api/v4/order/cancel");
        assert_eq!(parsed["nonce"], "1700000000000");
        assert_eq!(parsed["orderId"], 42);
        let payload = base64_encode(&body);
        assert_eq!(request.header_value("X-TXC-PAYLOAD"), Some(payload.as_str()));
        assert_eq!(
            request.header_value("X-TXC-SIGNATURE"),
            Some(hmac_sha512_hex("secret", &payload).unwrap().as_str())
        );
        assert_eq!(request.header_value("X-TXC-APIKEY"), Some("key"));
    }

    #[test]
    fn test_private_sign_requires_credentials() {
        let err = WhitebitClient::new()
            .sign(
                "fetch_balance",
                WhitebitApi::V4Private,
                Method::POST,
                "trade-account/balance",
                Params::new(),
                0,
            )
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_error_classification() {
        let client = WhitebitClient::new();
        let url = "https://whitebit.com/api/v4/order/new";
        let kind = |status: u16, body: &str| {
            client
                .handle_errors("create_order", &raw_response(status, url, body))
                .err()
                .and_then(|e| e.kind())
        };

        assert_eq!(kind(429, "Too many requests"), Some(ErrorKind::RateLimit));
        assert_eq!(kind(404, "not found"), Some(ErrorKind::Exchange));
        assert_eq!(
            kind(401, r#"{"code":10,"message":"Unauthorized request."}"#),
            Some(ErrorKind::Authentication)
        );
        // errors 의 첫 메시지가 exact 키
        assert_eq!(
            kind(
                422,
                r#"{"code":0,"message":"Validation failed","errors":{"amount":["Not enough balance"]}}"#
            ),
            Some(ErrorKind::InsufficientFunds)
        );
        // status 가 있으면 그 값이 exact 키
        assert_eq!(
            kind(
                200,
                r#"{"response":null,"status":422,"errors":{"orderId":["Finished order id 1 not found"]}}"#
            ),
            Some(ErrorKind::OrderNotFound)
        );
        assert_eq!(
            kind(
                400,
                r#"{"code":0,"message":"Validation failed","errors":{"total":["Total is less than 5.05"]}}"#
            ),
            Some(ErrorKind::InvalidOrder)
        );
        assert_eq!(
            kind(400, r#"{"code":99,"message":"Something else"}"#),
            Some(ErrorKind::Exchange)
        );
        assert_eq!(kind(200, r#"{"status":200,"result":[]}"#), None);
        assert_eq!(kind(200, r#"[{"orderId":1}]"#), None);
    }
}
