//! BTC-Alpha v1 응답 -> 통합 모델

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Deserialize;
use serde_json::Value;

use interface::{
    de,
    market::parse_precision,
    Balance, Balances, ExchangeError, Market, MarketIndex, MarketLimits, MarketPrecision, MinMax,
    Ohlcv, Order, OrderBook, OrderBookEntry, OrderStatus, OrderType, Side, Ticker, Trade,
    Transaction, TransactionStatus, TransactionType,
};

use crate::request::decode;

const DELIMITER: &str = "_";

/// ticker/trade 의 timestamp 는 1e6 을 곱해야 ms 가 된다
fn scaled_timestamp(value: Option<Decimal>, factor: i64) -> Option<i64> {
    value.and_then(|v| (v * Decimal::from(factor)).trunc().to_i64())
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    name: String,
    currency1: String,
    currency2: String,
    #[serde(default, deserialize_with = "de::opt_i64")]
    price_precision: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    amount_precision: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    minimum_order_size: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    maximum_order_size: Option<Decimal>,
}

pub fn parse_market(info: &Value, index: &MarketIndex) -> Result<Market, ExchangeError> {
    let raw: RawMarket = decode("pair", info.clone())?;
    let base = index.safe_currency_code(&raw.currency1);
    let quote = index.safe_currency_code(&raw.currency2);
    let min_price = raw.price_precision.and_then(parse_precision);
    let min_cost = match (min_price, raw.minimum_order_size) {
        (Some(price), Some(amount)) => Some(price * amount),
        _ => None,
    };
    Ok(Market {
        id: raw.name,
        symbol: format!("{}/{}", base, quote),
        base,
        quote,
        base_id: raw.currency1,
        quote_id: raw.currency2,
        active: Some(true),
        precision: MarketPrecision {
            amount: raw.amount_precision.and_then(parse_precision),
            price: min_price,
        },
        limits: MarketLimits {
            amount: MinMax::new(raw.minimum_order_size, raw.maximum_order_size),
            price: MinMax::new(min_price, None),
            cost: MinMax::new(min_cost, None),
        },
        maker: None,
        taker: None,
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    timestamp: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    buy: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    sell: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    diff: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    vol: Option<Decimal>,
}

pub fn parse_ticker(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Ticker, ExchangeError> {
    let raw: RawTicker = decode("ticker", info.clone())?;
    let symbol = match raw.pair.as_deref() {
        Some(id) => index.safe_symbol(id, market, Some(DELIMITER)),
        None => market.map(|m| m.symbol.clone()).unwrap_or_default(),
    };
    Ok(Ticker {
        symbol,
        timestamp: scaled_timestamp(raw.timestamp, 1_000_000),
        high: raw.high,
        low: raw.low,
        bid: raw.buy,
        ask: raw.sell,
        close: raw.last,
        last: raw.last,
        change: raw.diff,
        quote_volume: raw.vol,
        info: info.clone(),
        ..Default::default()
    }
    .complete())
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawOrderBook {
    #[serde(default)]
    buy: Vec<Option<RawLevel>>,
    #[serde(default)]
    sell: Vec<Option<RawLevel>>,
}

/// null 항목은 건너뛴다
fn levels(raw: Vec<Option<RawLevel>>) -> Vec<OrderBookEntry> {
    raw.into_iter()
        .flatten()
        .filter_map(|level| Some(OrderBookEntry::new(level.price?, level.amount?)))
        .collect()
}

pub fn parse_order_book(info: &Value, symbol: &str) -> Result<OrderBook, ExchangeError> {
    let raw: RawOrderBook = decode("order book", info.clone())?;
    Ok(OrderBook::new(symbol, levels(raw.buy), levels(raw.sell), None, info.clone()))
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    timestamp: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default)]
    my_side: Option<String>,
    #[serde(default, rename = "type")]
    trade_type: Option<String>,
}

pub fn parse_trade(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Trade, ExchangeError> {
    let raw: RawTrade = decode("trade", info.clone())?;
    let symbol = match raw.pair.as_deref() {
        Some(id) => index.safe_symbol(id, market, Some(DELIMITER)),
        None => market.map(|m| m.symbol.clone()).unwrap_or_default(),
    };
    let side = raw
        .my_side
        .as_deref()
        .or(raw.trade_type.as_deref())
        .and_then(Side::parse_loose);
    Ok(Trade {
        // 거래소가 주문 id 를 따로 주지 않는다
        order: raw.id.clone(),
        id: raw.id,
        timestamp: scaled_timestamp(raw.timestamp, 1_000_000),
        symbol: (!symbol.is_empty()).then_some(symbol),
        side,
        order_type: Some(OrderType::Limit),
        taker_or_maker: None,
        price: raw.price,
        amount: raw.amount,
        cost: None,
        fee: None,
        info: info.clone(),
    }
    .complete())
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(default, deserialize_with = "de::opt_i64")]
    time: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    open: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    close: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    volume: Option<Decimal>,
}

/// time 은 초 단위
pub fn parse_ohlcv(info: &Value) -> Result<Option<Ohlcv>, ExchangeError> {
    let raw: RawCandle = decode("candle", info.clone())?;
    Ok((|| {
        Some(Ohlcv {
            timestamp: raw.time? * 1000,
            open: raw.open?,
            high: raw.high?,
            low: raw.low?,
            close: raw.close?,
            volume: raw.volume?,
        })
    })())
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    currency: String,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    balance: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    reserve: Option<Decimal>,
}

pub fn parse_balance(info: &Value, index: &MarketIndex) -> Result<Balances, ExchangeError> {
    let rows: Vec<RawBalance> = decode("wallets", info.clone())?;
    let mut balances = Balances::new(info.clone());
    for row in rows {
        balances.insert(
            index.safe_currency_code(&row.currency),
            Balance {
                free: None,
                used: row.reserve,
                total: row.balance,
            },
        );
    }
    Ok(balances)
}

pub fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "1" => OrderStatus::Open,
        "2" => OrderStatus::Canceled,
        "3" => OrderStatus::Closed,
        other => OrderStatus::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    #[serde(default, deserialize_with = "de::opt_string")]
    oid: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    success: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    date: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    /// 남은 수량
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount_filled: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount_original: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
    #[serde(default)]
    my_side: Option<String>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default)]
    trades: Vec<Value>,
}

/// 주문 생성 응답(success 있음)은 date 가 초, 조회 응답은 ms
pub fn parse_order(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Order, ExchangeError> {
    let raw: RawOrder = decode("order", info.clone())?;
    let market = match raw.pair.as_deref() {
        Some(id) => index.safe_market(id, market, Some(DELIMITER)),
        None => market.cloned().unwrap_or_default(),
    };
    let timestamp = if raw.success.unwrap_or(false) {
        scaled_timestamp(raw.date, 1000)
    } else {
        scaled_timestamp(raw.date, 1)
    };
    let trades = raw
        .trades
        .iter()
        .map(|trade| parse_trade(trade, Some(&market), index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Order {
        id: raw.oid.or(raw.id),
        client_order_id: None,
        timestamp,
        last_trade_timestamp: None,
        symbol: (!market.symbol.is_empty()).then(|| market.symbol.clone()),
        side: raw
            .my_side
            .as_deref()
            .or(raw.order_type.as_deref())
            .and_then(Side::parse_loose),
        order_type: Some(OrderType::Limit),
        time_in_force: None,
        post_only: None,
        price: raw.price,
        trigger_price: None,
        amount: raw.amount_original,
        filled: raw.amount_filled,
        remaining: raw.amount,
        cost: None,
        average: None,
        status: raw.status.as_deref().map(parse_order_status),
        fee: None,
        trades,
        info: info.clone(),
    }
    .complete())
}

pub fn parse_transaction_status(raw: &str) -> TransactionStatus {
    match raw {
        "10" | "20" => TransactionStatus::Pending,
        "30" => TransactionStatus::Ok,
        "40" => TransactionStatus::Failed,
        "50" => TransactionStatus::Canceled,
        other => TransactionStatus::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    timestamp: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_string")]
    currency: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
}

/// 응답에 종류가 없어서 호출한 엔드포인트로 정한다
pub fn parse_transaction(
    info: &Value,
    tx_type: TransactionType,
    index: &MarketIndex,
) -> Result<Transaction, ExchangeError> {
    let raw: RawTransaction = decode("transaction", info.clone())?;
    Ok(Transaction {
        id: raw.id,
        txid: None,
        timestamp: scaled_timestamp(raw.timestamp, 1000),
        network: None,
        address: None,
        address_from: None,
        address_to: None,
        tag: None,
        tag_from: None,
        tag_to: None,
        tx_type: Some(tx_type),
        amount: raw.amount,
        currency: raw.currency.as_deref().map(|id| index.safe_currency_code(id)),
        status: raw.status.as_deref().map(parse_transaction_status),
        updated: None,
        comment: None,
        fee: None,
        info: info.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::ExchangeId;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn index() -> MarketIndex {
        let mut index = MarketIndex::new(ExchangeId::BtcAlpha, &[("CBC", "Cashbery")]);
        let market = parse_market(
            &json!({
                "name": "ETH_BTC",
                "currency1": "ETH",
                "currency2": "BTC",
                "price_precision": 6,
                "amount_precision": 4,
                "minimum_order_size": "0.01",
                "maximum_order_size": "1000"
            }),
            &index,
        )
        .unwrap();
        index.set_markets(vec![market]);
        index
    }

    #[test]
    fn test_parse_market_limits() {
        let index = index();
        let market = index.market("ETH/BTC").unwrap();
        assert_eq!(market.precision.price, Some(dec!(0.000001)));
        assert_eq!(market.precision.amount, Some(dec!(0.0001)));
        assert_eq!(market.limits.cost.min, Some(dec!(0.00000001)));
        assert_eq!(market.limits.amount.max, Some(dec!(1000)));
    }

    #[test]
    fn test_ticker_timestamp_scaling() {
        let ticker = parse_ticker(
            &json!({
                "timestamp": 1674658.445018,
                "pair": "ETH_BTC",
                "last": "0.07",
                "diff": "0.01",
                "vol": "12",
                "high": "0.08",
                "low": "0.06",
                "buy": "0.069",
                "sell": "0.071"
            }),
            None,
            &index(),
        )
        .unwrap();
        assert_eq!(ticker.symbol, "ETH/BTC");
        assert_eq!(ticker.timestamp, Some(1_674_658_445_018));
        assert_eq!(ticker.open, Some(dec!(0.06)));
        assert_eq!(ticker.bid, Some(dec!(0.069)));
    }

    #[test]
    fn test_order_book_skips_null_levels() {
        let book = parse_order_book(
            &json!({
                "buy": [{"price": "1", "amount": "2"}, null, {"price": "3", "amount": "1"}],
                "sell": [{"price": "4", "amount": "1"}]
            }),
            "ETH/BTC",
        )
        .unwrap();
        assert_eq!(book.bids.len(), 2);
        assert_eq!(book.best_bid().unwrap().price, dec!(3));
        assert_eq!(book.best_ask().unwrap().price, dec!(4));
    }

    #[test]
    fn test_parse_order_remaining_and_status() {
        let order = parse_order(
            &json!({
                "id": 327,
                "date": 1674658445018i64,
                "type": "sell",
                "pair": "ETH_BTC",
                "price": "0.07",
                "amount": "0.25",
                "amount_original": "1",
                "amount_filled": "0.75",
                "status": "1"
            }),
            None,
            &index(),
        )
        .unwrap();
        assert_eq!(order.id.as_deref(), Some("327"));
        assert_eq!(order.timestamp, Some(1_674_658_445_018));
        assert_eq!(order.status, Some(OrderStatus::Open));
        assert_eq!(order.side, Some(Side::Sell));
        assert_eq!(order.remaining, Some(dec!(0.25)));
        assert_eq!(order.cost, Some(dec!(0.0525)));
    }

    #[test]
    fn test_created_order_date_in_seconds() {
        let order = parse_order(
            &json!({"success": true, "date": 1674658.5, "oid": 11, "type": "buy", "pair": "ETH_BTC"}),
            None,
            &index(),
        )
        .unwrap();
        assert_eq!(order.id.as_deref(), Some("11"));
        assert_eq!(order.timestamp, Some(1_674_658_500));
    }

    #[test]
    fn test_balance_and_transaction() {
        let balances = parse_balance(
            &json!([{"currency": "BTC", "balance": "1.5", "reserve": "0.5"}]),
            &index(),
        )
        .unwrap();
        assert_eq!(balances.entries["BTC"].free, Some(dec!(1.0)));

        let tx = parse_transaction(
            &json!({"id": 9, "timestamp": 1700000000, "currency": "BTC", "amount": "0.1", "status": 30}),
            TransactionType::Withdrawal,
            &index(),
        )
        .unwrap();
        assert_eq!(tx.status, Some(TransactionStatus::Ok));
        assert_eq!(tx.timestamp, Some(1_700_000_000_000));
        assert_eq!(tx.tx_type, Some(TransactionType::Withdrawal));
    }

    #[test]
    fn test_ohlcv_seconds() {
        let candle = parse_ohlcv(&json!({
            "time": 1700000000, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10
        }))
        .unwrap()
        .unwrap();
        assert_eq!(candle.timestamp, 1_700_000_000_000);
        assert_eq!(candle.low, dec!(0.5));
    }
}
