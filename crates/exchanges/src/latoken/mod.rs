use std::sync::atomic::{AtomicI64, Ordering};

use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::RwLock;

use interface::{
    de::value_string,
    signing::{hmac_sha512_hex, implode_path, urlencode},
    time::milliseconds,
    Access, BroadRule, Capability, Description, Endpoint, ErrorKind, ErrorTable, ExchangeConfig,
    ExchangeError, ExchangeId, MarketIndex, Params, TradingFeeSchedule,
};

use crate::request::{Classifier, RawResponse, RestAdapter, SignedRequest};

pub mod parse;
mod private;
mod public;

pub const BASE_URL: &str = "https://api.latoken.com";
pub const VERSION: &str = "v2";
const ENV_PREFIX: &str = "LATOKEN";

pub static DESCRIPTION: Description = Description {
    id: ExchangeId::Latoken,
    name: "Latoken",
    countries: &["KY"],
    version: VERSION,
    rate_limit: 1000,
    hosts: &[("rest", BASE_URL)],
    timeframes: &[],
    fees: TradingFeeSchedule {
        maker: dec!(0.0049),
        taker: dec!(0.0049),
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
        Capability::FetchTime,
        Capability::FetchTradingFee,
        Capability::FetchBalance,
        Capability::CreateOrder,
        Capability::CancelOrder,
        Capability::CancelAllOrders,
        Capability::FetchOrder,
        Capability::FetchOrders,
        Capability::FetchOpenOrders,
        Capability::FetchMyTrades,
        Capability::FetchDeposits,
        Capability::FetchWithdrawals,
        Capability::FetchTransactions,
    ],
    endpoints: &[
        Endpoint::public("GET", "book/{currency}/{quote}", 1),
        Endpoint::public("GET", "currency", 1),
        Endpoint::public("GET", "pair", 1),
        Endpoint::public("GET", "ticker", 1),
        Endpoint::public("GET", "ticker/{base}/{quote}", 1),
        Endpoint::public("GET", "time", 1),
        Endpoint::public("GET", "trade/history/{currency}/{quote}", 1),
        Endpoint::public("GET", "trade/fee/{currency}/{quote}", 1),
        Endpoint::private("GET", "auth/account", 1),
        Endpoint::private("GET", "auth/order", 1),
        Endpoint::private("GET", "auth/order/getOrder/{id}", 1),
        Endpoint::private("GET", "auth/order/pair/{currency}/{quote}", 1),
        Endpoint::private("GET", "auth/order/pair/{currency}/{quote}/active", 1),
        Endpoint::private("GET", "auth/trade", 1),
        Endpoint::private("GET", "auth/trade/pair/{currency}/{quote}", 1),
        Endpoint::private("GET", "auth/trade/fee/{currency}/{quote}", 1),
        Endpoint::private("GET", "auth/transaction", 1),
        Endpoint::private("POST", "auth/order/cancel", 1),
        Endpoint::private("POST", "auth/order/cancelAll", 1),
        Endpoint::private("POST", "auth/order/cancelAll/{currency}/{quote}", 1),
        Endpoint::private("POST", "auth/order/place", 1),
    ],
    exact: &[
        ("INTERNAL_ERROR", ErrorKind::Exchange),
        ("SERVICE_UNAVAILABLE", ErrorKind::ExchangeNotAvailable),
        ("NOT_AUTHORIZED", ErrorKind::Authentication),
        ("FORBIDDEN", ErrorKind::PermissionDenied),
        ("BAD_REQUEST", ErrorKind::BadRequest),
        ("NOT_FOUND", ErrorKind::Exchange),
        ("ACCESS_DENIED", ErrorKind::PermissionDenied),
        ("REQUEST_REJECTED", ErrorKind::Exchange),
        ("HTTP_MEDIA_TYPE_NOT_SUPPORTED", ErrorKind::BadRequest),
        ("MEDIA_TYPE_NOT_ACCEPTABLE", ErrorKind::BadRequest),
        ("METHOD_ARGUMENT_NOT_VALID", ErrorKind::BadRequest),
        ("VALIDATION_ERROR", ErrorKind::BadRequest),
        ("ACCOUNT_EXPIRED", ErrorKind::AccountSuspended),
        ("BAD_CREDENTIALS", ErrorKind::Authentication),
        ("COOKIE_THEFT", ErrorKind::Authentication),
        ("CREDENTIALS_EXPIRED", ErrorKind::AccountSuspended),
        ("INSUFFICIENT_AUTHENTICATION", ErrorKind::Authentication),
        ("UNKNOWN_LOCATION", ErrorKind::Authentication),
        ("TOO_MANY_REQUESTS", ErrorKind::RateLimit),
        ("INSUFFICIENT_FUNDS", ErrorKind::InsufficientFunds),
        ("ORDER_VALIDATION", ErrorKind::InvalidOrder),
        ("BAD_TICKS", ErrorKind::InvalidOrder),
    ],
    broad: &[
        BroadRule::new("invalid API key, signature or digest", ErrorKind::Authentication),
        BroadRule::new("The API key was revoked", ErrorKind::Authentication),
        BroadRule::new("request expired or bad", ErrorKind::InvalidNonce),
        BroadRule::new("For input string", ErrorKind::BadRequest),
        BroadRule::new("Unable to resolve currency by tag", ErrorKind::BadSymbol),
        BroadRule::new("Can't find currency with tag", ErrorKind::BadSymbol),
        BroadRule::new(
            "Unable to place order because pair is in inactive state",
            ErrorKind::BadSymbol,
        ),
        BroadRule::new("API keys are not available for", ErrorKind::AccountSuspended),
    ],
    common_currencies: &[
        ("BUX", "Buxcoin"),
        ("CBT", "Community Business Token"),
        ("CTC", "CyberTronchain"),
        ("DMD", "Diamond Coin"),
        ("FREN", "Frenchie"),
        ("GDX", "GoldenX"),
        ("GEC", "Geco One"),
        ("GEM", "NFTmall"),
        ("GMT", "GMT Token"),
        ("IMC", "IMCoin"),
        ("MT", "Monarch"),
        ("TPAY", "Tetra Pay"),
        ("TRADE", "Smart Trade Coin"),
        ("TSL", "Treasure SL"),
        ("UNO", "Unobtanium"),
        ("WAR", "Warrior Token"),
    ],
};

/// fetch_balance 가 보는 계정
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccountType {
    Wallet,
    #[default]
    Spot,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Wallet => "ACCOUNT_TYPE_WALLET",
            AccountType::Spot => "ACCOUNT_TYPE_SPOT",
        }
    }
}

/// fetch_trading_fee 가 호출할 엔드포인트
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TradingFeeSource {
    Public,
    /// 계정 등급이 반영된 수수료
    #[default]
    Private,
}

#[derive(Debug, Clone)]
pub struct LatokenOptions {
    pub account_type: AccountType,
    pub trading_fee_source: TradingFeeSource,
    /// fetch_markets 때 서버 시각과의 차이를 다시 잰다
    pub adjust_for_time_difference: bool,
}

impl Default for LatokenOptions {
    fn default() -> Self {
        Self {
            account_type: AccountType::Spot,
            trading_fee_source: TradingFeeSource::Private,
            adjust_for_time_difference: true,
        }
    }
}

pub fn has_api_credentials() -> bool {
    ExchangeConfig::from_env(ENV_PREFIX).has_credentials()
}

/// Latoken v2 클라이언트
pub struct LatokenClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ExchangeConfig,
    pub(crate) options: LatokenOptions,
    pub(crate) index: RwLock<MarketIndex>,
    pub(crate) errors: ErrorTable,
    /// 로컬 시각 - 서버 시각 (ms)
    pub(crate) time_difference: AtomicI64,
}

impl LatokenClient {
    pub fn new() -> Self {
        Self::from_parts(reqwest::Client::new(), ExchangeConfig::new())
    }

    /// LATOKEN_API_KEY / LATOKEN_API_SECRET 으로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let config = ExchangeConfig::from_env(ENV_PREFIX);
        if !config.has_credentials() {
            return Err(ExchangeError::Other(
                "LATOKEN_API_KEY or LATOKEN_API_SECRET not found".to_string(),
            ));
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = config.http_client()?;
        Ok(Self::from_parts(http, config))
    }

    pub fn with_options(mut self, options: LatokenOptions) -> Self {
        self.options = options;
        self
    }

    fn from_parts(http: reqwest::Client, config: ExchangeConfig) -> Self {
        Self {
            http,
            config,
            options: LatokenOptions::default(),
            index: RwLock::new(MarketIndex::new(
                ExchangeId::Latoken,
                DESCRIPTION.common_currencies,
            )),
            errors: DESCRIPTION.error_table(),
            time_difference: AtomicI64::new(0),
        }
    }

    fn host(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(BASE_URL)
    }

    pub fn time_difference(&self) -> i64 {
        self.time_difference.load(Ordering::Relaxed)
    }

    pub(crate) fn set_time_difference(&self, difference: i64) {
        self.time_difference.store(difference, Ordering::Relaxed);
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

impl Default for LatokenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestAdapter for LatokenClient {
    type Api = Access;

    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::Latoken
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

    /// 서명 문자열: METHOD + /v2/path + urlencode(query). POST 도 본문 파라미터를 같은 방식으로 넣는다.
    fn sign(
        &self,
        method_name: &'static str,
        api: Access,
        verb: Method,
        path: &str,
        params: Params,
        _nonce: i64,
    ) -> Result<SignedRequest, ExchangeError> {
        let (imploded, query) = implode_path(path, &params)?;
        let request_path = format!("/{}/{}", VERSION, imploded);
        let encoded = urlencode(&query);
        let mut request_string = request_path.clone();
        if verb == Method::GET && !query.is_empty() {
            request_string.push('?');
            request_string.push_str(&encoded);
        }
        let url = format!("{}{}", self.host(), request_string);
        if api == Access::Public {
            return Ok(SignedRequest::new(verb, url));
        }

        let (api_key, secret) = self.config.credentials(ExchangeId::Latoken, method_name)?;
        let auth = format!("{}{}{}", verb.as_str(), request_path, encoded);
        let signature = hmac_sha512_hex(secret, &auth)?;
        let is_post = verb == Method::POST;
        let mut request = SignedRequest::new(verb, url)
            .header("X-LA-APIKEY", api_key)
            .header("X-LA-SIGNATURE", signature)
            .header("X-LA-DIGEST", "HMAC-SHA512");
        if is_post {
            let body = serde_json::to_string(&query)
                .map_err(|e| ExchangeError::Other(format!("Failed to encode body: {}", e)))?;
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
        let c = Classifier::new(&self.errors, ExchangeId::Latoken, method_name, &response.body);
        if let Some(message) = body.get("message").and_then(value_string) {
            c.exact(&message)?;
            c.broad(&message)?;
        }
        let error = body.get("error").filter(|e| !e.is_null());
        let error_message = error.and_then(|e| e.get("message")).and_then(value_string);
        if error.is_some() || error_message.is_some() {
            if let Some(code) = error.and_then(value_string) {
                c.exact(&code)?;
            }
            c.broad(&response.body)?;
            return Err(c.generic());
        }
        Ok(())
    }

    /// 서버 시각 기준 ms
    fn nonce(&self) -> i64 {
        milliseconds() - self.time_difference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{params, raw_response};
    use serde_json::json;

    fn signed_client() -> LatokenClient {
        LatokenClient::with_config(
            ExchangeConfig::new()
                .with_api_key("key")
                .with_secret("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_get_sign_string() {
        let request = signed_client()
            .sign(
                "fetch_orders",
                Access::Private,
                Method::GET,
                "auth/order/pair/{currency}/{quote}",
                params(json!({"currency": "base-id", "quote": "quote-id", "limit": 10})),
                0,
            )
            .unwrap();
        assert_eq!(
            request.url,
            "https://api.latoken.com/v2/auth/order/pair/base-id/quote-id?limit=10"
        );
        let auth = "GET/v2/auth/order/pair/base-id/quote-idlimit=10";
        assert_eq!(
            request.header_value("X-LA-SIGNATURE"),
            Some(hmac_sha512_hex("secret", auth).unwrap().as_str())
        );
        assert_eq!(request.header_value("X-LA-DIGEST"), Some("HMAC-SHA512"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_post_sign_sends_json() {
        let request = signed_client()
            .sign(
                "cancel_order",
                Access::Private,
                Method::POST,
                "auth/order/cancel",
                params(json!({"id": "abc"})),
                0,
            )
            .unwrap();
        assert_eq!(request.url, "https://api.latoken.com/v2/auth/order/cancel");
        assert_eq!(request.body.as_deref(), Some(r#"{"id":"abc"}"#));
        let auth = "POST/v2/auth/order/cancelid=abc";
        assert_eq!(
            request.header_value("X-LA-SIGNATURE"),
            Some(hmac_sha512_hex("secret", auth).unwrap().as_str())
        );
    }

    fn classify(status: u16, body: &str) -> Result<(), ExchangeError> {
        LatokenClient::new().handle_errors("test", &raw_response(status, "https://x", body))
    }

    #[test]
    fn test_error_field_exact() {
        let err = classify(
            400,
            r#"{"message":"not enough balance on the spot account for currency (USDT), need (20.000)","error":"INSUFFICIENT_FUNDS","status":"FAILURE"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientFunds));
    }

    #[test]
    fn test_message_broad_before_error() {
        let err = classify(
            401,
            r#"{"result":false,"message":"request expired or bad <timeAlive>/<timestamp> format","error":"BAD_REQUEST","status":"FAILURE"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidNonce));
    }

    #[test]
    fn test_broad_on_body_and_generic() {
        let err = classify(
            400,
            r#"{"result":false,"message":"Internal error","error":"For input string: \"NaN\"","status":"FAILURE"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));

        let err = classify(400, r#"{"error":"SOMETHING_NEW"}"#).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Exchange));

        assert!(classify(200, r#"{"message":"order accepted for placing","status":"SUCCESS","id":"1"}"#).is_ok());
        assert!(classify(200, r#"[{"id":"1"}]"#).is_ok());
    }

    #[test]
    fn test_nonce_uses_time_difference() {
        let client = LatokenClient::new();
        client.set_time_difference(60_000);
        let nonce = client.nonce();
        assert!(milliseconds() - nonce >= 60_000);
    }
}
