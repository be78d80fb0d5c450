pub mod classify;
pub mod config;
pub mod de;
pub mod describe;
pub mod error;
pub mod market;
pub mod model;
pub mod request;
pub mod signing;
pub mod time;
pub mod timeframe;

pub use classify::{http_status_kind, BroadRule, ErrorTable};
pub use config::ExchangeConfig;
pub use describe::{Access, Capability, Description, Endpoint, TradingFeeSchedule};
pub use error::{ErrorKind, ExchangeError};
pub use market::{
    Currency, CurrencyLimits, CurrencyNetwork, Market, MarketIndex, MarketLimits,
    MarketPrecision, MinMax,
};
pub use model::{
    Balance, Balances, DepositAddress, ExchangeId, Fee, Ohlcv, Order, OrderBook, OrderBookEntry,
    OrderStatus, OrderType, Side, TakerOrMaker, Ticker, TimeInForce, Timestamped, Trade,
    TradingFee, Transaction, TransactionStatus, TransactionType,
};
pub use request::{CreateOrderRequest, Page, Params, TriggerDirection, WithdrawRequest};
pub use timeframe::Timeframe;

pub use rust_decimal::Decimal;
