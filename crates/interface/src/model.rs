use std::{collections::BTreeMap, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{ser::SerializeSeq, Serialize, Serializer};
use serde_json::Value;

use crate::time::iso8601;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Bittrex,
    BtcAlpha,
    Latoken,
    Bitopro,
    Whitebit,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 5] = [
        ExchangeId::Bittrex,
        ExchangeId::BtcAlpha,
        ExchangeId::Latoken,
        ExchangeId::Bitopro,
        ExchangeId::Whitebit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Bittrex => "bittrex",
            ExchangeId::BtcAlpha => "btcalpha",
            ExchangeId::Latoken => "latoken",
            ExchangeId::Bitopro => "bitopro",
            ExchangeId::Whitebit => "whitebit",
        }
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ExchangeId::ALL
            .into_iter()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| format!("unknown exchange: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// buy/sell 외에 bid/ask 표기도 받는다
    pub fn parse_loose(s: &str) -> Option<Side> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(Side::Buy),
            "sell" | "ask" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerOrMaker {
    Taker,
    Maker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

/// 통합 값 몇 개 + 매핑되지 않은 원본 문자열을 그대로 담는 Other
macro_rules! unified_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $s,)*
                    $name::Other(raw) => raw.as_str(),
                }
            }

            /// 통합 표기 문자열이면 해당 값, 아니면 Other(원본)
            pub fn from_unified(s: &str) -> Self {
                match s {
                    $($s => $name::$variant,)*
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

unified_enum!(OrderType {
    Limit => "limit",
    Market => "market",
});

unified_enum!(TimeInForce {
    Gtc => "GTC",
    Ioc => "IOC",
    Fok => "FOK",
    Po => "PO",
});

unified_enum!(
    /// open/closed/canceled 으로 매핑하지 못한 값은 Other 로 그대로 전달
    OrderStatus {
        Open => "open",
        Closed => "closed",
        Canceled => "canceled",
        Expired => "expired",
        Rejected => "rejected",
    }
);

unified_enum!(TransactionStatus {
    Pending => "pending",
    Ok => "ok",
    Failed => "failed",
    Canceled => "canceled",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fee {
    pub cost: Option<Decimal>,
    pub currency: Option<String>,
    pub rate: Option<Decimal>,
}

impl Fee {
    pub fn new(cost: Option<Decimal>, currency: Option<String>) -> Option<Fee> {
        if cost.is_none() && currency.is_none() {
            return None;
        }
        Some(Fee {
            cost,
            currency,
            rate: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub open: Option<Decimal>,
    pub close: Option<Decimal>,
    pub last: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub average: Option<Decimal>,
    pub base_volume: Option<Decimal>,
    pub quote_volume: Option<Decimal>,
    pub info: Value,
}

impl Ticker {
    /// 응답에 있는 값만으로 계산 가능한 필드를 채운다
    pub fn complete(mut self) -> Self {
        if self.last.is_none() {
            self.last = self.close;
        }
        if self.close.is_none() {
            self.close = self.last;
        }
        if let (None, Some(last), Some(change)) = (self.open, self.last, self.change) {
            self.open = Some(last - change);
        }
        if let (Some(open), Some(last)) = (self.open, self.last) {
            if self.change.is_none() {
                self.change = Some(last - open);
            }
            if self.average.is_none() {
                self.average = Some((open + last) / Decimal::TWO);
            }
        }
        if let (None, Some(change), Some(open)) = (self.percentage, self.change, self.open) {
            if !open.is_zero() {
                self.percentage = Some(change / open * Decimal::ONE_HUNDRED);
            }
        }
        if let (None, Some(quote), Some(base)) = (self.vwap, self.quote_volume, self.base_volume) {
            if !base.is_zero() {
                self.vwap = Some(quote / base);
            }
        }
        self
    }

    pub fn datetime(&self) -> Option<String> {
        self.timestamp.and_then(iso8601)
    }
}

/// 호가 한 단계. JSON 으로는 `[price, amount]` 로 직렬화된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBookEntry {
    pub price: Decimal,
    pub amount: Decimal,
}

impl OrderBookEntry {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

impl Serialize for OrderBookEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.price)?;
        seq.serialize_element(&self.amount)?;
        seq.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<OrderBookEntry>,
    pub asks: Vec<OrderBookEntry>,
    pub timestamp: Option<i64>,
    pub nonce: Option<i64>,
    pub info: Value,
}

impl OrderBook {
    /// bids 는 가격 내림차순, asks 는 오름차순으로 정렬한다
    pub fn new(
        symbol: impl Into<String>,
        mut bids: Vec<OrderBookEntry>,
        mut asks: Vec<OrderBookEntry>,
        timestamp: Option<i64>,
        info: Value,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
            nonce: None,
            info,
        }
    }

    pub fn with_nonce(mut self, nonce: Option<i64>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            self.bids.truncate(limit);
            self.asks.truncate(limit);
        }
        self
    }

    pub fn best_bid(&self) -> Option<&OrderBookEntry> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookEntry> {
        self.asks.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Option<String>,
    pub client_order_id: Option<String>,
    pub timestamp: Option<i64>,
    pub last_trade_timestamp: Option<i64>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub time_in_force: Option<TimeInForce>,
    pub post_only: Option<bool>,
    pub price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub filled: Option<Decimal>,
    pub remaining: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub average: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub fee: Option<Fee>,
    pub trades: Vec<Trade>,
    pub info: Value,
}

impl Order {
    /// amount/filled/remaining 중 둘이 있으면 나머지를 계산하고
    /// cost = 체결가 x 체결량, average = cost / filled
    pub fn complete(mut self) -> Self {
        if let Some(amount) = self.amount {
            match (self.filled, self.remaining) {
                (Some(filled), None) => {
                    self.remaining = Some((amount - filled).max(Decimal::ZERO));
                }
                (None, Some(remaining)) => {
                    self.filled = Some((amount - remaining).max(Decimal::ZERO));
                }
                _ => {}
            }
        }
        if self.cost.is_none() {
            if let (Some(filled), Some(price)) = (self.filled, self.average.or(self.price)) {
                self.cost = Some(filled * price);
            }
        }
        if self.average.is_none() {
            if let (Some(cost), Some(filled)) = (self.cost, self.filled) {
                if !filled.is_zero() {
                    self.average = Some(cost / filled);
                }
            }
        }
        if self.post_only.is_none() {
            if let Some(tif) = &self.time_in_force {
                self.post_only = Some(*tif == TimeInForce::Po);
            }
        }
        self
    }

    pub fn datetime(&self) -> Option<String> {
        self.timestamp.and_then(iso8601)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: Option<String>,
    pub order: Option<String>,
    pub timestamp: Option<i64>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub taker_or_maker: Option<TakerOrMaker>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub fee: Option<Fee>,
    pub info: Value,
}

impl Trade {
    pub fn complete(mut self) -> Self {
        if self.cost.is_none() {
            if let (Some(price), Some(amount)) = (self.price, self.amount) {
                self.cost = Some(price * amount);
            }
        }
        self
    }

    pub fn datetime(&self) -> Option<String> {
        self.timestamp.and_then(iso8601)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Option<String>,
    pub txid: Option<String>,
    pub timestamp: Option<i64>,
    pub network: Option<String>,
    pub address: Option<String>,
    pub address_from: Option<String>,
    pub address_to: Option<String>,
    pub tag: Option<String>,
    pub tag_from: Option<String>,
    pub tag_to: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<TransactionStatus>,
    pub updated: Option<i64>,
    pub comment: Option<String>,
    pub fee: Option<Fee>,
    pub info: Value,
}

impl Transaction {
    pub fn datetime(&self) -> Option<String> {
        self.timestamp.and_then(iso8601)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub free: Option<Decimal>,
    pub used: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl Balance {
    /// free/used/total 중 둘만 있으면 나머지 하나를 계산
    pub fn complete(mut self) -> Self {
        match (self.free, self.used, self.total) {
            (Some(free), None, Some(total)) => self.used = Some(total - free),
            (Some(free), Some(used), None) => self.total = Some(free + used),
            (None, Some(used), Some(total)) => self.free = Some(total - used),
            _ => {}
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Balances {
    pub timestamp: Option<i64>,
    pub entries: BTreeMap<String, Balance>,
    pub info: Value,
}

impl Balances {
    pub fn new(info: Value) -> Self {
        Self {
            timestamp: None,
            entries: BTreeMap::new(),
            info,
        }
    }

    pub fn insert(&mut self, code: impl Into<String>, balance: Balance) {
        self.entries.insert(code.into(), balance.complete());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ohlcv {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingFee {
    pub symbol: String,
    pub maker: Option<Decimal>,
    pub taker: Option<Decimal>,
    pub percentage: Option<bool>,
    pub tier_based: Option<bool>,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepositAddress {
    pub currency: String,
    pub address: String,
    pub tag: Option<String>,
    pub network: Option<String>,
    pub info: Value,
}

pub trait Timestamped {
    fn timestamp(&self) -> Option<i64>;
}

impl Timestamped for Trade {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

impl Timestamped for Order {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

impl Timestamped for Transaction {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

impl Timestamped for Ohlcv {
    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// 시간순 정렬 후 since 이후만 남기고 limit 개로 자른다.
/// since 가 없으면 가장 최근 limit 개를 남긴다.
pub fn filter_by_since_limit<T: Timestamped>(
    mut items: Vec<T>,
    since: Option<i64>,
    limit: Option<usize>,
) -> Vec<T> {
    items.sort_by_key(|item| item.timestamp());
    if let Some(since) = since {
        items.retain(|item| item.timestamp().map_or(false, |ts| ts >= since));
    }
    if let Some(limit) = limit {
        if items.len() > limit {
            if since.is_some() {
                items.truncate(limit);
            } else {
                items.drain(..items.len() - limit);
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_exchange_id_round_trip() {
        for id in ExchangeId::ALL {
            assert_eq!(id.to_string().parse::<ExchangeId>().unwrap(), id);
        }
        assert!("binance".parse::<ExchangeId>().is_err());
    }

    #[test]
    fn test_unified_enum_passthrough() {
        assert_eq!(OrderStatus::from_unified("open"), OrderStatus::Open);
        assert_eq!(
            OrderStatus::from_unified("PARTIAL"),
            OrderStatus::Other("PARTIAL".into())
        );
        assert_eq!(OrderStatus::Other("PARTIAL".into()).as_str(), "PARTIAL");
        assert_eq!(serde_json::to_value(TimeInForce::Gtc).unwrap(), json!("GTC"));
    }

    #[test]
    fn test_ticker_complete() {
        let ticker = Ticker {
            symbol: "BTC/USDT".into(),
            open: Some(dec!(100)),
            last: Some(dec!(110)),
            base_volume: Some(dec!(2)),
            quote_volume: Some(dec!(210)),
            ..Default::default()
        }
        .complete();
        assert_eq!(ticker.close, Some(dec!(110)));
        assert_eq!(ticker.change, Some(dec!(10)));
        assert_eq!(ticker.percentage, Some(dec!(10)));
        assert_eq!(ticker.average, Some(dec!(105)));
        assert_eq!(ticker.vwap, Some(dec!(105)));
    }

    #[test]
    fn test_ticker_complete_leaves_unknowns() {
        let ticker = Ticker {
            symbol: "BTC/USDT".into(),
            last: Some(dec!(110)),
            ..Default::default()
        }
        .complete();
        assert_eq!(ticker.open, None);
        assert_eq!(ticker.change, None);
        assert_eq!(ticker.percentage, None);
    }

    #[test]
    fn test_order_complete() {
        let order = Order {
            id: Some("1".into()),
            amount: Some(dec!(2)),
            filled: Some(dec!(0.5)),
            price: Some(dec!(100)),
            ..Default::default()
        }
        .complete();
        assert_eq!(order.remaining, Some(dec!(1.5)));
        assert_eq!(order.cost, Some(dec!(50)));
        assert_eq!(order.average, Some(dec!(100)));
    }

    #[test]
    fn test_order_complete_from_cost() {
        let order = Order {
            id: Some("1".into()),
            amount: Some(dec!(2)),
            remaining: Some(dec!(0)),
            cost: Some(dec!(210)),
            ..Default::default()
        }
        .complete();
        assert_eq!(order.filled, Some(dec!(2)));
        assert_eq!(order.average, Some(dec!(105)));
    }

    #[test]
    fn test_balance_complete() {
        let b = Balance {
            free: Some(dec!(1)),
            used: None,
            total: Some(dec!(3)),
        }
        .complete();
        assert_eq!(b.used, Some(dec!(2)));

        let b = Balance {
            free: Some(dec!(1)),
            used: None,
            total: None,
        }
        .complete();
        assert_eq!(b.total, None);
    }

    #[test]
    fn test_order_book_sorted_and_serialized() {
        let book = OrderBook::new(
            "BTC/USDT",
            vec![
                OrderBookEntry::new(dec!(99), dec!(1)),
                OrderBookEntry::new(dec!(100), dec!(0.01)),
            ],
            vec![
                OrderBookEntry::new(dec!(102), dec!(1)),
                OrderBookEntry::new(dec!(101), dec!(0.02)),
            ],
            None,
            Value::Null,
        );
        assert_eq!(book.best_bid().unwrap().price, dec!(100));
        assert_eq!(book.best_ask().unwrap().price, dec!(101));
        let v = serde_json::to_value(book.limit(Some(1))).unwrap();
        assert_eq!(v["bids"], json!([["100", "0.01"]]));
    }

    #[test]
    fn test_filter_by_since_limit() {
        let trades: Vec<Trade> = [3, 1, 2, 5, 4]
            .iter()
            .map(|ts| Trade {
                timestamp: Some(*ts),
                ..Default::default()
            })
            .collect();
        let tail = filter_by_since_limit(trades.clone(), None, Some(2));
        assert_eq!(
            tail.iter().map(|t| t.timestamp).collect::<Vec<_>>(),
            vec![Some(4), Some(5)]
        );
        let head = filter_by_since_limit(trades, Some(2), Some(2));
        assert_eq!(
            head.iter().map(|t| t.timestamp).collect::<Vec<_>>(),
            vec![Some(2), Some(3)]
        );
    }
}
