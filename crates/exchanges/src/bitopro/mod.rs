use std::collections::BTreeMap;

use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use interface::{
    de::value_string,
    signing::{append_query, base64_encode, hmac_sha384_hex, implode_path},
    Access, BroadRule, Capability, Description, Endpoint, ErrorKind, ErrorTable, ExchangeConfig,
    ExchangeError, ExchangeId, MarketIndex, Params, Timeframe, TradingFeeSchedule,
};

use crate::request::{Classifier, RawResponse, RestAdapter, SignedRequest};

pub mod parse;
mod private;
mod public;

pub const BASE_URL: &str = "https://api.bitopro.com/v3";
const ENV_PREFIX: &str = "BITOPRO";

pub static DESCRIPTION: Description = Description {
    id: ExchangeId::Bitopro,
    name: "BitoPro",
    countries: &["TW"],
    version: "v3",
    rate_limit: 100,
    hosts: &[("rest", BASE_URL)],
    timeframes: &[
        (Timeframe::M1, "1m"),
        (Timeframe::M5, "5m"),
        (Timeframe::M15, "15m"),
        (Timeframe::M30, "30m"),
        (Timeframe::H1, "1h"),
        (Timeframe::H3, "3h"),
        (Timeframe::H6, "6h"),
        (Timeframe::H12, "12h"),
        (Timeframe::D1, "1d"),
        (Timeframe::W1, "1w"),
        (Timeframe::Mo1, "1M"),
    ],
    fees: TradingFeeSchedule {
        maker: dec!(0.001),
        taker: dec!(0.002),
        percentage: true,
        tier_based: true,
    },
    has: &[
        Capability::FetchMarkets,
        Capability::FetchCurrencies,
        Capability::FetchTicker,
        Capability::FetchTickers,
        Capability::FetchOrderBook,
        Capability::FetchTrades,
        Capability::FetchOhlcv,
        Capability::FetchTradingFees,
        Capability::FetchBalance,
        Capability::CreateOrder,
        Capability::CancelOrder,
        Capability::CancelOrders,
        Capability::CancelAllOrders,
        Capability::FetchOrder,
        Capability::FetchOrders,
        Capability::FetchOpenOrders,
        Capability::FetchClosedOrders,
        Capability::FetchMyTrades,
        Capability::FetchDeposits,
        Capability::FetchWithdrawals,
        Capability::FetchWithdrawal,
        Capability::Withdraw,
    ],
    endpoints: &[
        Endpoint::public("GET", "order-book/{pair}", 1),
        Endpoint::public("GET", "tickers", 1),
        Endpoint::public("GET", "tickers/{pair}", 1),
        Endpoint::public("GET", "trades/{pair}", 1),
        Endpoint::public("GET", "provisioning/currencies", 1),
        Endpoint::public("GET", "provisioning/trading-pairs", 1),
        Endpoint::public("GET", "provisioning/limitations-and-fees", 1),
        Endpoint::public("GET", "trading-history/{pair}", 1),
        Endpoint::private("GET", "accounts/balance", 1),
        Endpoint::private("GET", "orders/history", 1),
        Endpoint::private("GET", "orders/all/{pair}", 1),
        Endpoint::private("GET", "orders/trades/{pair}", 1),
        Endpoint::private("GET", "orders/{pair}/{orderId}", 1),
        Endpoint::private("GET", "wallet/withdraw/{currency}/{serial}", 1),
        Endpoint::private("GET", "wallet/withdraw/{currency}/id/{id}", 1),
        Endpoint::private("GET", "wallet/depositHistory/{currency}", 1),
        Endpoint::private("GET", "wallet/withdrawHistory/{currency}", 1),
        Endpoint::private("POST", "orders/{pair}", 1),
        Endpoint::private("POST", "orders/batch", 1),
        Endpoint::private("POST", "wallet/withdraw/{currency}", 1),
        Endpoint::private("PUT", "orders", 1),
        Endpoint::private("DELETE", "orders/{pair}/{id}", 1),
        Endpoint::private("DELETE", "orders/all", 1),
        Endpoint::private("DELETE", "orders/{pair}", 1),
    ],
    exact: &[
        ("Unsupported currency.", ErrorKind::BadRequest),
        ("Unsupported order type", ErrorKind::BadRequest),
        ("Invalid body", ErrorKind::BadRequest),
        ("Invalid Signature", ErrorKind::Authentication),
        ("Address not in whitelist.", ErrorKind::BadRequest),
    ],
    // 순서대로 검사한다. "Invalid amount" 가 "Invalid " 보다 먼저.
    broad: &[
        BroadRule::new("Invalid amount", ErrorKind::InvalidOrder),
        BroadRule::new("Balance for ", ErrorKind::InsufficientFunds),
        BroadRule::new("Invalid ", ErrorKind::BadRequest),
        BroadRule::new("Wrong parameter", ErrorKind::BadRequest),
    ],
    common_currencies: &[],
};

#[derive(Debug, Clone)]
pub struct BitoproOptions {
    /// 통합 네트워크 이름 -> 출금 protocol
    pub networks: BTreeMap<String, String>,
}

impl Default for BitoproOptions {
    fn default() -> Self {
        let networks = [
            ("ERC20", "ERC20"),
            ("ETH", "ERC20"),
            ("TRX", "TRX"),
            ("TRC20", "TRX"),
            ("BEP20", "BSC"),
            ("BSC", "BSC"),
        ]
        .into_iter()
        .map(|(code, id)| (code.to_string(), id.to_string()))
        .collect();
        Self { networks }
    }
}

impl BitoproOptions {
    pub fn network_id(&self, network: &str) -> Option<&str> {
        self.networks
            .get(&network.to_uppercase())
            .map(String::as_str)
    }

    /// 같은 protocol 에 여러 이름이 있으면 사전순 첫 이름
    pub fn network_code(&self, id: &str) -> String {
        self.networks
            .iter()
            .find(|(_, v)| v.as_str() == id)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

pub fn has_api_credentials() -> bool {
    ExchangeConfig::from_env(ENV_PREFIX).has_credentials()
}

/// BitoPro v3 클라이언트
pub struct BitoproClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ExchangeConfig,
    pub(crate) options: BitoproOptions,
    pub(crate) index: RwLock<MarketIndex>,
    pub(crate) errors: ErrorTable,
}

impl BitoproClient {
    pub fn new() -> Self {
        Self::from_parts(reqwest::Client::new(), ExchangeConfig::new())
    }

    /// BITOPRO_API_KEY / BITOPRO_API_SECRET 으로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let config = ExchangeConfig::from_env(ENV_PREFIX);
        if !config.has_credentials() {
            return Err(ExchangeError::Other(
                "BITOPRO_API_KEY or BITOPRO_API_SECRET not found".to_string(),
            ));
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = config.http_client()?;
        Ok(Self::from_parts(http, config))
    }

    pub fn with_options(mut self, options: BitoproOptions) -> Self {
        self.options = options;
        self
    }

    fn from_parts(http: reqwest::Client, config: ExchangeConfig) -> Self {
        Self {
            http,
            config,
            options: BitoproOptions::default(),
            index: RwLock::new(MarketIndex::new(
                ExchangeId::Bitopro,
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

impl Default for BitoproClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestAdapter for BitoproClient {
    type Api = Access;

    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Bitopro
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

    /// POST/PUT 은 JSON 본문을, GET/DELETE 는 {"nonce": ms} 를 base64 로 서명한다
    fn sign(
        &self,
        method_name: &'static str,
        api: Access,
        verb: Method,
        path: &str,
        params: Params,
        nonce: i64,
    ) -> Result<SignedRequest, ExchangeError> {
        let (imploded, query) = implode_path(path, &params)?;
        let url = format!("{}/{}", self.host(), imploded);
        if api == Access::Public {
            return Ok(SignedRequest::new(verb, append_query(&url, &query)));
        }

        let (api_key, secret) = self.config.credentials(ExchangeId::Bitopro, method_name)?;
        let (request, payload) = if verb == Method::POST || verb == Method::PUT {
            let body = serde_json::to_string(&query)
                .map_err(|e| ExchangeError::Other(format!("Failed to encode body: {}", e)))?;
            let payload = base64_encode(&body);
            let request = SignedRequest::new(verb, url)
                .header("Content-Type", "application/json")
                .body(body);
            (request, payload)
        } else {
            let payload = base64_encode(&json!({ "nonce": nonce }).to_string());
            (SignedRequest::new(verb, append_query(&url, &query)), payload)
        };
        let signature = hmac_sha384_hex(secret, &payload)?;
        Ok(request
            .header("X-BITOPRO-APIKEY", api_key)
            .header("X-BITOPRO-PAYLOAD", payload)
            .header("X-BITOPRO-SIGNATURE", signature))
    }

    /// 2xx 응답은 보지 않는다
    fn handle_errors(
        &self,
        method_name: &'static str,
        response: &RawResponse,
    ) -> Result<(), ExchangeError> {
        if response.is_success() {
            return Ok(());
        }
        let Some(json) = &response.json else {
            return Ok(());
        };
        let c = Classifier::new(&self.errors, ExchangeId::Bitopro, method_name, &response.body);
        if let Some(error) = json.get("error").and_then(value_string) {
            c.exact(&error)?;
            c.broad(&error)?;
        }
        Err(c.generic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{params, raw_response};

    fn signed_client() -> BitoproClient {
        BitoproClient::with_config(
            ExchangeConfig::new()
                .with_api_key("key")
                .with_secret("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_post_sign_payload_is_body() {
        let request = signed_client()
            .sign(
                "create_order",
                Access::Private,
                Method::POST,
                "orders/{pair}",
                params(json!({"pair": "btc_twd", "action": "buy", "amount": "1"})),
                1_700_000_000_000,
            )
            .unwrap();
        assert_eq!(request.url, "https://api.bitopro.com/v3/orders/btc_twd");
        let body = r#"{"action":"buy","amount":"1"}"#;
        assert_eq!(request.body.as_deref(), Some(body));
        let payload = base64_encode(body);
        assert_eq!(request.header_value("X-BITOPRO-PAYLOAD"), Some(payload.as_str()));
        assert_eq!(
            request.header_value("X-BITOPRO-SIGNATURE"),
            Some(hmac_sha384_hex("secret", &payload).unwrap().as_str())
        );
    }

    #[test]
    fn test_get_sign_payload_is_nonce() {
        let request = signed_client()
            .sign(
                "fetch_orders",
                Access::Private,
                Method::GET,
                "orders/all/{pair}",
                params(json!({"pair": "btc_twd", "statusKind": "OPEN"})),
                1_700_000_000_000,
            )
            .unwrap();
        assert_eq!(
            request.url,
            "https://api.bitopro.com/v3/orders/all/btc_twd?statusKind=OPEN"
        );
        assert_eq!(request.body, None);
        let payload = base64_encode(r#"{"nonce":1700000000000}"#);
        assert_eq!(request.header_value("X-BITOPRO-PAYLOAD"), Some(payload.as_str()));
        assert_eq!(request.header_value("X-BITOPRO-APIKEY"), Some("key"));
    }

    fn classify(status: u16, body: &str) -> Result<(), ExchangeError> {
        BitoproClient::new().handle_errors("test", &raw_response(status, "https://x", body))
    }

    #[test]
    fn test_error_classification() {
        let kind = |status, body| classify(status, body).unwrap_err().kind();
        assert_eq!(kind(400, r#"{"error":"Invalid Signature"}"#), Some(ErrorKind::Authentication));
        assert_eq!(
            kind(400, r#"{"error":"Invalid amount 0.0000000001, decimal limit is 8."}"#),
            Some(ErrorKind::InvalidOrder)
        );
        assert_eq!(
            kind(400, r#"{"error":"Balance for eth not enough, only has 0, but ordered 0.01."}"#),
            Some(ErrorKind::InsufficientFunds)
        );
        assert_eq!(kind(400, r#"{"error":"Invalid price -1."}"#), Some(ErrorKind::BadRequest));
        assert_eq!(kind(400, r#"{"error":"boom"}"#), Some(ErrorKind::Exchange));
        // 2xx 는 error 필드가 있어도 통과
        assert!(classify(200, r#"{"error":"Invalid body"}"#).is_ok());
    }

    #[test]
    fn test_network_lookup() {
        let options = BitoproOptions::default();
        assert_eq!(options.network_id("trc20"), Some("TRX"));
        assert_eq!(options.network_id("SOL"), None);
        assert_eq!(options.network_code("BSC"), "BEP20");
        assert_eq!(options.network_code("XRP"), "XRP");
    }
}
