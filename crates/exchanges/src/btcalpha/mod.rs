use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::RwLock;

use interface::{
    de::value_string,
    signing::{append_query, hmac_sha256_hex, implode_path, urlencode},
    Access, BroadRule, Capability, Description, Endpoint, ErrorKind, ErrorTable, ExchangeConfig,
    ExchangeError, ExchangeId, MarketIndex, Params, Timeframe, TradingFeeSchedule,
};

use crate::request::{Classifier, RawResponse, RestAdapter, SignedRequest};

pub mod parse;
mod private;
mod public;

pub const BASE_URL: &str = "https://btc-alpha.com/api";
pub const VERSION: &str = "v1";
const ENV_PREFIX: &str = "BTCALPHA";
/// 차트 엔드포인트만 버전 prefix 가 없다
const CHART_PATH: &str = "charts/{pair}/{type}/chart/";

pub static DESCRIPTION: Description = Description {
    id: ExchangeId::BtcAlpha,
    name: "BTC-Alpha",
    countries: &["US"],
    version: VERSION,
    rate_limit: 2000,
    hosts: &[("rest", BASE_URL)],
    timeframes: &[
        (Timeframe::M5, "5"),
        (Timeframe::M15, "15"),
        (Timeframe::M30, "30"),
        (Timeframe::H1, "60"),
        (Timeframe::H4, "240"),
        (Timeframe::D1, "D"),
    ],
    fees: TradingFeeSchedule {
        maker: dec!(0.002),
        taker: dec!(0.002),
        percentage: true,
        tier_based: false,
    },
    has: &[
        Capability::FetchMarkets,
        Capability::FetchTicker,
        Capability::FetchTickers,
        Capability::FetchOrderBook,
        Capability::FetchTrades,
        Capability::FetchOhlcv,
        Capability::FetchBalance,
        Capability::CreateOrder,
        Capability::CancelOrder,
        Capability::FetchOrder,
        Capability::FetchOrders,
        Capability::FetchOpenOrders,
        Capability::FetchClosedOrders,
        Capability::FetchMyTrades,
        Capability::FetchDeposits,
        Capability::FetchWithdrawals,
    ],
    endpoints: &[
        Endpoint::public("GET", "currencies/", 1),
        Endpoint::public("GET", "pairs/", 1),
        Endpoint::public("GET", "orderbook/{pair_name}", 1),
        Endpoint::public("GET", "exchanges/", 1),
        Endpoint::public("GET", CHART_PATH, 1),
        Endpoint::public("GET", "ticker/", 1),
        Endpoint::private("GET", "wallets/", 1),
        Endpoint::private("GET", "orders/own/", 1),
        Endpoint::private("GET", "order/{id}/", 1),
        Endpoint::private("GET", "exchanges/own/", 1),
        Endpoint::private("GET", "deposits/", 1),
        Endpoint::private("GET", "withdraws/", 1),
        Endpoint::private("POST", "order/", 1),
        Endpoint::private("POST", "order-cancel/", 1),
    ],
    exact: &[],
    broad: &[BroadRule::new("Out of balance", ErrorKind::InsufficientFunds)],
    common_currencies: &[("CBC", "Cashbery")],
};

pub fn has_api_credentials() -> bool {
    ExchangeConfig::from_env(ENV_PREFIX).has_credentials()
}

/// BTC-Alpha v1 클라이언트
pub struct BtcAlphaClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ExchangeConfig,
    pub(crate) index: RwLock<MarketIndex>,
    pub(crate) errors: ErrorTable,
}

impl BtcAlphaClient {
    pub fn new() -> Self {
        Self::from_parts(reqwest::Client::new(), ExchangeConfig::new())
    }

    /// BTCALPHA_API_KEY / BTCALPHA_API_SECRET 으로 생성
    pub fn with_credentials() -> Result<Self, ExchangeError> {
        let config = ExchangeConfig::from_env(ENV_PREFIX);
        if !config.has_credentials() {
            return Err(ExchangeError::Other(
                "BTCALPHA_API_KEY or BTCALPHA_API_SECRET not found".to_string(),
            ));
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ExchangeConfig) -> Result<Self, ExchangeError> {
        let http = config.http_client()?;
        Ok(Self::from_parts(http, config))
    }

    fn from_parts(http: reqwest::Client, config: ExchangeConfig) -> Self {
        Self {
            http,
            config,
            index: RwLock::new(MarketIndex::new(
                ExchangeId::BtcAlpha,
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

impl Default for BtcAlphaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RestAdapter for BtcAlphaClient {
    type Api = Access;

    fn exchange_id(&self) -> ExchangeId {
        ExchangeId::BtcAlpha
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
        let (imploded, query) = implode_path(path, &params)?;
        let url = if path == CHART_PATH {
            format!("{}/{}", self.host(), imploded)
        } else {
            format!("{}/{}/{}", self.host(), VERSION, imploded)
        };
        let request = SignedRequest::new(verb.clone(), String::new()).header("Accept", "application/json");
        if api == Access::Public {
            return Ok(SignedRequest {
                url: append_query(&url, &query),
                ..request
            });
        }

        let (api_key, secret) = self.config.credentials(ExchangeId::BtcAlpha, method_name)?;
        let mut payload = api_key.to_string();
        let mut request = if verb == Method::POST {
            let body = urlencode(&query);
            payload.push_str(&body);
            SignedRequest { url, ..request }
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body)
        } else {
            SignedRequest {
                url: append_query(&url, &query),
                ..request
            }
        };
        request = request
            .header("X-KEY", api_key)
            .header("X-SIGN", hmac_sha256_hex(secret, &payload)?)
            .header("X-NONCE", nonce.to_string());
        Ok(request)
    }

    fn handle_errors(
        &self,
        method_name: &'static str,
        response: &RawResponse,
    ) -> Result<(), ExchangeError> {
        let Some(json) = &response.json else {
            return Ok(());
        };
        let c = Classifier::new(&self.errors, ExchangeId::BtcAlpha, method_name, &response.body);
        if let Some(error) = json.get("error").and_then(value_string) {
            c.exact(&error)?;
            c.broad(&error)?;
        }
        match response.status {
            401 | 403 => Err(c.error(ErrorKind::Authentication)),
            429 => Err(c.error(ErrorKind::RateLimit)),
            status if status >= 400 => Err(c.generic()),
            _ => Ok(()),
        }
    }
}
