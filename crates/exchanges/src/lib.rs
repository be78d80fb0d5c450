use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use interface::{
    Balances, Capability, CreateOrderRequest, Currency, DepositAddress, Description,
    ExchangeConfig, ExchangeError, ExchangeId, Market, MarketIndex, Ohlcv, Order, OrderBook, Page,
    Ticker, Timeframe, Trade, Transaction, WithdrawRequest,
};

pub mod bitopro;
pub mod bittrex;
pub mod btcalpha;
pub mod latoken;
pub(crate) mod request;
pub mod whitebit;

#[async_trait]
pub trait Exchange: Send + Sync {
    fn id(&self) -> ExchangeId;

    fn describe(&self) -> &'static Description;

    /// load_markets 가 채우는 공유 인덱스
    fn index(&self) -> &RwLock<MarketIndex>;

    fn has(&self, capability: Capability) -> bool {
        self.describe().has(capability)
    }
}

#[async_trait]
pub trait PublicExchange: Exchange {
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError>;

    async fn fetch_currencies(&self) -> Result<BTreeMap<String, Currency>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_currencies"))
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    /// symbols 가 None 이면 거래소가 주는 전체 티커
    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError>;

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<OrderBook, ExchangeError>;

    async fn fetch_trades(&self, symbol: &str, page: Page) -> Result<Vec<Trade>, ExchangeError>;

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _page: Page,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_ohlcv"))
    }

    /// 거래소 서버 시각 (epoch ms)
    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_time"))
    }

    /// 통화 목록이 있는 거래소는 통화를 먼저, 그 다음 마켓을 채운다.
    /// reload 가 false 면 이미 로드된 인덱스를 그대로 쓴다.
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        {
            let index = self.index().read().await;
            if index.is_loaded() && !reload {
                return Ok(index.markets().cloned().collect());
            }
        }
        if self.has(Capability::FetchCurrencies) {
            let currencies = self.fetch_currencies().await?;
            self.index()
                .write()
                .await
                .set_currencies(currencies.into_values());
        }
        let markets = self.fetch_markets().await?;
        info!(exchange = %self.id(), markets = markets.len(), "markets loaded");
        self.index().write().await.set_markets(markets.clone());
        Ok(markets)
    }

    /// 통합 심볼로 마켓 조회. 필요하면 먼저 load_markets 를 호출한다.
    async fn market(&self, symbol: &str) -> Result<Market, ExchangeError> {
        self.load_markets(false).await?;
        let index = self.index().read().await;
        index.market_or_err(symbol, "market").cloned()
    }
}

#[async_trait]
pub trait PrivateExchange: PublicExchange {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError>;

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError>;

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError>;

    async fn cancel_all_orders(&self, _symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "cancel_all_orders"))
    }

    async fn fetch_order(&self, _id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_order"))
    }

    async fn fetch_orders(
        &self,
        _symbol: Option<&str>,
        _page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_orders"))
    }

    async fn fetch_open_orders(
        &self,
        _symbol: Option<&str>,
        _page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_open_orders"))
    }

    async fn fetch_closed_orders(
        &self,
        _symbol: Option<&str>,
        _page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_closed_orders"))
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError>;

    async fn fetch_deposits(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError>;

    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError>;

    async fn fetch_deposit_address(
        &self,
        _code: &str,
        _network: Option<&str>,
    ) -> Result<DepositAddress, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "fetch_deposit_address"))
    }

    async fn withdraw(&self, _request: &WithdrawRequest) -> Result<Transaction, ExchangeError> {
        Err(ExchangeError::not_supported(self.id(), "withdraw"))
    }
}

/// id 로 어댑터를 만든다. 옵션은 각 어댑터의 기본값을 쓴다.
pub fn build(
    id: ExchangeId,
    config: ExchangeConfig,
) -> Result<Box<dyn PrivateExchange>, ExchangeError> {
    Ok(match id {
        ExchangeId::Bittrex => Box::new(BittrexClient::with_config(config)?),
        ExchangeId::BtcAlpha => Box::new(BtcAlphaClient::with_config(config)?),
        ExchangeId::Latoken => Box::new(LatokenClient::with_config(config)?),
        ExchangeId::Bitopro => Box::new(BitoproClient::with_config(config)?),
        ExchangeId::Whitebit => Box::new(WhitebitClient::with_config(config)?),
    })
}

// Convenience re-exports
pub use bitopro::{BitoproClient, BitoproOptions};
pub use bittrex::{BittrexClient, BittrexOptions};
pub use btcalpha::BtcAlphaClient;
pub use latoken::{LatokenClient, LatokenOptions};
pub use whitebit::{WhitebitClient, WhitebitOptions};
