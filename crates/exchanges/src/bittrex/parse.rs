//! Bittrex v3 응답 -> 통합 모델

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use interface::{
    de,
    market::parse_precision,
    time::parse8601,
    Balance, Balances, Currency, CurrencyLimits, ExchangeError, Fee, Market, MarketIndex,
    MarketLimits, MarketPrecision, MinMax, Ohlcv, Order, OrderBook, OrderBookEntry, OrderStatus,
    OrderType, Side, TakerOrMaker, Ticker, TimeInForce, Trade, TradingFee, Transaction,
    TransactionStatus, TransactionType,
};

use crate::request::decode;

const DELIMITER: &str = "-";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    symbol: String,
    base_currency_symbol: String,
    quote_currency_symbol: String,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_trade_size: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    precision: Option<i64>,
    #[serde(default)]
    status: Option<String>,
}

pub fn parse_market(info: &Value, index: &MarketIndex) -> Result<Market, ExchangeError> {
    let raw: RawMarket = decode("market", info.clone())?;
    let base = index.safe_currency_code(&raw.base_currency_symbol);
    let quote = index.safe_currency_code(&raw.quote_currency_symbol);
    Ok(Market {
        id: raw.symbol,
        symbol: format!("{}/{}", base, quote),
        base,
        quote,
        base_id: raw.base_currency_symbol,
        quote_id: raw.quote_currency_symbol,
        // OFFLINE 마켓도 목록에 남긴다
        active: Some(raw.status.as_deref() == Some("ONLINE")),
        precision: MarketPrecision {
            amount: Some(dec!(0.00000001)),
            price: raw.precision.and_then(parse_precision),
        },
        limits: MarketLimits {
            amount: MinMax::new(raw.min_trade_size, None),
            ..Default::default()
        },
        maker: None,
        taker: None,
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCurrency {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    coin_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    tx_fee: Option<Decimal>,
}

pub fn parse_currency(info: &Value, index: &MarketIndex) -> Result<Currency, ExchangeError> {
    let raw: RawCurrency = decode("currency", info.clone())?;
    let precision = dec!(0.00000001);
    Ok(Currency {
        code: index.safe_currency_code(&raw.symbol),
        id: raw.symbol,
        name: raw.name,
        currency_type: raw.coin_type,
        active: Some(raw.status.as_deref() == Some("ONLINE")),
        deposit: None,
        withdraw: None,
        fee: raw.tx_fee,
        precision: Some(precision),
        limits: CurrencyLimits {
            amount: MinMax::new(Some(precision), None),
            withdraw: MinMax::new(raw.tx_fee, None),
            ..Default::default()
        },
        networks: Default::default(),
        info: info.clone(),
    })
}

/// ticker 와 summary 응답을 모두 받는다 (없는 필드는 None)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    bid_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    ask_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last_trade_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    percent_change: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    volume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quote_volume: Option<Decimal>,
}

pub fn parse_ticker(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Ticker, ExchangeError> {
    let raw: RawTicker = decode("ticker", info.clone())?;
    let symbol = match raw.symbol.as_deref() {
        Some(id) => index.safe_symbol(id, market, Some(DELIMITER)),
        None => market.map(|m| m.symbol.clone()).unwrap_or_default(),
    };
    Ok(Ticker {
        symbol,
        timestamp: raw.updated_at.as_deref().and_then(parse8601),
        high: raw.high,
        low: raw.low,
        bid: raw.bid_rate,
        ask: raw.ask_rate,
        close: raw.last_trade_rate,
        last: raw.last_trade_rate,
        percentage: raw.percent_change,
        base_volume: raw.volume,
        quote_volume: raw.quote_volume,
        info: info.clone(),
        ..Default::default()
    }
    .complete())
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawOrderBook {
    #[serde(default)]
    bid: Vec<RawLevel>,
    #[serde(default)]
    ask: Vec<RawLevel>,
}

fn levels(raw: Vec<RawLevel>) -> Vec<OrderBookEntry> {
    raw.into_iter()
        .filter_map(|level| Some(OrderBookEntry::new(level.rate?, level.quantity?)))
        .collect()
}

/// nonce 는 응답 헤더 `Sequence`
pub fn parse_order_book(
    info: &Value,
    symbol: &str,
    nonce: Option<i64>,
) -> Result<OrderBook, ExchangeError> {
    let raw: RawOrderBook = decode("order book", info.clone())?;
    Ok(OrderBook::new(symbol, levels(raw.bid), levels(raw.ask), None, info.clone()).with_nonce(nonce))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    order_id: Option<String>,
    #[serde(default)]
    market_symbol: Option<String>,
    #[serde(default)]
    executed_at: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    rate: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default)]
    taker_side: Option<String>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    is_taker: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    commission: Option<Decimal>,
}

pub fn parse_trade(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Trade, ExchangeError> {
    let raw: RawTrade = decode("trade", info.clone())?;
    let market = match raw.market_symbol.as_deref() {
        Some(id) => index.safe_market(id, market, Some(DELIMITER)),
        None => market.cloned().unwrap_or_default(),
    };
    let mut side = raw
        .taker_side
        .as_deref()
        .or(raw.direction.as_deref())
        .and_then(Side::parse_loose);
    let taker_or_maker = raw.is_taker.map(|is_taker| {
        if is_taker {
            TakerOrMaker::Taker
        } else {
            TakerOrMaker::Maker
        }
    });
    // executions 의 maker 체결은 takerSide 가 상대방 기준이라 뒤집는다
    if raw.is_taker == Some(false) {
        side = side.map(|s| match s {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        });
    }
    let fee = raw.commission.map(|cost| Fee {
        cost: Some(cost),
        currency: (!market.quote.is_empty()).then(|| market.quote.clone()),
        rate: None,
    });
    Ok(Trade {
        id: raw.id,
        order: raw.order_id,
        timestamp: raw.executed_at.as_deref().and_then(parse8601),
        symbol: (!market.symbol.is_empty()).then_some(market.symbol),
        side,
        order_type: None,
        taker_or_maker,
        price: raw.rate,
        amount: raw.quantity,
        cost: None,
        fee,
        info: info.clone(),
    }
    .complete())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandle {
    starts_at: String,
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

/// 값이 빠진 캔들은 None
pub fn parse_ohlcv(info: &Value) -> Result<Option<Ohlcv>, ExchangeError> {
    let raw: RawCandle = decode("candle", info.clone())?;
    Ok((|| {
        Some(Ohlcv {
            timestamp: parse8601(&raw.starts_at)?,
            open: raw.open?,
            high: raw.high?,
            low: raw.low?,
            close: raw.close?,
            volume: raw.volume?,
        })
    })())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBalance {
    currency_symbol: String,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    available: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    total: Option<Decimal>,
}

pub fn parse_balance(info: &Value, index: &MarketIndex) -> Result<Balances, ExchangeError> {
    let rows: Vec<RawBalance> = decode("balances", info.clone())?;
    let mut balances = Balances::new(info.clone());
    for row in rows {
        balances.insert(
            index.safe_currency_code(&row.currency_symbol),
            Balance {
                free: row.available,
                used: None,
                total: row.total,
            },
        );
    }
    Ok(balances)
}

pub fn parse_time_in_force(raw: &str) -> TimeInForce {
    match raw {
        "GOOD_TIL_CANCELLED" => TimeInForce::Gtc,
        "IMMEDIATE_OR_CANCEL" => TimeInForce::Ioc,
        "FILL_OR_KILL" => TimeInForce::Fok,
        "POST_ONLY_GOOD_TIL_CANCELLED" => TimeInForce::Po,
        other => TimeInForce::Other(other.to_string()),
    }
}

pub fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "CLOSED" => OrderStatus::Closed,
        "OPEN" => OrderStatus::Open,
        "CANCELLED" | "CANCELED" => OrderStatus::Canceled,
        other => OrderStatus::Other(other.to_string()),
    }
}

fn parse_order_type(raw: &str) -> OrderType {
    match raw.to_ascii_lowercase().as_str() {
        "limit" => OrderType::Limit,
        "market" => OrderType::Market,
        other => OrderType::Other(other.to_string()),
    }
}

/// 조건부 주문은 주문 필드가 orderToCreate / orderToCancel 안에 있다
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderFields {
    #[serde(default)]
    direction: Option<String>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    limit: Option<Decimal>,
    #[serde(default)]
    time_in_force: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default)]
    market_symbol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    client_order_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    closed_at: Option<String>,
    #[serde(flatten)]
    fields: RawOrderFields,
    #[serde(default)]
    order_to_create: Option<RawOrderFields>,
    #[serde(default)]
    order_to_cancel: Option<RawOrderFields>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    trigger_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fill_quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    commission: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    proceeds: Option<Decimal>,
    #[serde(default)]
    status: Option<String>,
}

pub fn parse_order(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Order, ExchangeError> {
    let raw: RawOrder = decode("order", info.clone())?;
    let market = match raw.market_symbol.as_deref() {
        Some(id) => index.safe_market(id, market, Some(DELIMITER)),
        None => market.cloned().unwrap_or_default(),
    };
    let nested = raw
        .order_to_create
        .as_ref()
        .or(raw.order_to_cancel.as_ref());
    let direction = raw
        .fields
        .direction
        .clone()
        .or_else(|| nested.and_then(|n| n.direction.clone()));
    let order_type = raw
        .fields
        .order_type
        .clone()
        .or_else(|| nested.and_then(|n| n.order_type.clone()));
    let time_in_force = raw
        .fields
        .time_in_force
        .clone()
        .or_else(|| nested.and_then(|n| n.time_in_force.clone()));
    let quantity = raw
        .fields
        .quantity
        .or_else(|| nested.and_then(|n| n.quantity));
    let limit = raw.fields.limit.or_else(|| nested.and_then(|n| n.limit));

    let time_in_force = time_in_force.as_deref().map(parse_time_in_force);
    let post_only = time_in_force.as_ref().map(|tif| *tif == TimeInForce::Po);
    let last_trade_timestamp = raw
        .closed_at
        .as_deref()
        .or(raw.updated_at.as_deref())
        .and_then(parse8601);

    Ok(Order {
        id: raw.id,
        client_order_id: raw.client_order_id,
        timestamp: raw.created_at.as_deref().and_then(parse8601),
        last_trade_timestamp,
        symbol: (!market.symbol.is_empty()).then(|| market.symbol.clone()),
        side: direction.as_deref().and_then(Side::parse_loose),
        order_type: order_type.as_deref().map(parse_order_type),
        time_in_force,
        post_only,
        price: limit,
        trigger_price: raw.trigger_price,
        amount: quantity,
        filled: raw.fill_quantity,
        remaining: None,
        cost: raw.proceeds,
        average: None,
        status: raw.status.as_deref().map(parse_order_status),
        fee: Fee::new(
            raw.commission,
            (!market.quote.is_empty()).then(|| market.quote.clone()),
        ),
        trades: Vec::new(),
        info: info.clone(),
    }
    .complete())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    client_withdrawal_id: Option<String>,
    #[serde(default)]
    currency_symbol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default)]
    crypto_address: Option<String>,
    #[serde(default)]
    crypto_address_tag: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tx_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    tx_cost: Option<Decimal>,
}

pub fn parse_withdrawal_status(raw: &str, has_txid: bool) -> TransactionStatus {
    match raw {
        "ERROR_INVALID_ADDRESS" => TransactionStatus::Failed,
        "CANCELLED" => TransactionStatus::Canceled,
        "PENDING" => TransactionStatus::Pending,
        "COMPLETED" => TransactionStatus::Ok,
        "AUTHORIZED" if has_txid => TransactionStatus::Ok,
        _ => TransactionStatus::Pending,
    }
}

/// 입금/출금 구분은 응답에 createdAt 이 있는지로 추정한다 (휴리스틱).
/// 입금 응답에는 createdAt 이 없다.
pub fn parse_transaction(info: &Value, index: &MarketIndex) -> Result<Transaction, ExchangeError> {
    let raw: RawTransaction = decode("transaction", info.clone())?;
    let updated = raw.updated_at.as_deref().and_then(parse8601);
    let opened = raw.created_at.as_deref().and_then(parse8601);
    let tx_type = if opened.is_none() {
        TransactionType::Deposit
    } else {
        TransactionType::Withdrawal
    };
    let status = match tx_type {
        TransactionType::Deposit => TransactionStatus::Ok,
        TransactionType::Withdrawal => parse_withdrawal_status(
            raw.status.as_deref().unwrap_or_default(),
            raw.tx_id.is_some(),
        ),
    };
    let fee_cost = match (raw.tx_cost, tx_type) {
        (Some(cost), _) => Some(cost),
        (None, TransactionType::Deposit) => Some(Decimal::ZERO),
        (None, TransactionType::Withdrawal) => None,
    };
    let code = raw
        .currency_symbol
        .as_deref()
        .map(|id| index.safe_currency_code(id));
    let (address_from, address_to) = if raw.source.as_deref() == Some("BLOCKCHAIN") {
        (raw.crypto_address.clone(), None)
    } else {
        (None, raw.crypto_address.clone())
    };
    Ok(Transaction {
        id: raw.id.or(raw.client_withdrawal_id),
        txid: raw.tx_id,
        timestamp: opened.or(updated),
        network: None,
        address: raw.crypto_address,
        address_from,
        address_to,
        tag: raw.crypto_address_tag,
        tag_from: None,
        tag_to: None,
        tx_type: Some(tx_type),
        amount: raw.quantity,
        fee: Some(Fee {
            cost: fee_cost,
            currency: code.clone(),
            rate: None,
        }),
        currency: code,
        status: Some(status),
        updated,
        comment: None,
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTradingFee {
    #[serde(default)]
    market_symbol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    maker_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    taker_rate: Option<Decimal>,
}

pub fn parse_trading_fee(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<TradingFee, ExchangeError> {
    let raw: RawTradingFee = decode("trading fee", info.clone())?;
    let symbol = match raw.market_symbol.as_deref() {
        Some(id) => index.safe_symbol(id, market, Some(DELIMITER)),
        None => market.map(|m| m.symbol.clone()).unwrap_or_default(),
    };
    Ok(TradingFee {
        symbol,
        maker: raw.maker_rate,
        taker: raw.taker_rate,
        percentage: None,
        tier_based: None,
        info: info.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::ExchangeId;
    use serde_json::json;

    fn index() -> MarketIndex {
        let mut index = MarketIndex::new(ExchangeId::Bittrex, &[("REPV2", "REP")]);
        let market = parse_market(
            &json!({
                "symbol": "ETH-BTC",
                "baseCurrencySymbol": "ETH",
                "quoteCurrencySymbol": "BTC",
                "minTradeSize": "0.01",
                "precision": 8,
                "status": "ONLINE"
            }),
            &index,
        )
        .unwrap();
        index.set_markets(vec![market]);
        index
    }

    #[test]
    fn test_parse_order_book_scenario() {
        let book = parse_order_book(
            &json!({"bid":[{"quantity":"0.01","rate":"100"}],"ask":[{"quantity":"0.02","rate":"101"}]}),
            "ETH/BTC",
            Some(7),
        )
        .unwrap();
        assert_eq!(book.bids, vec![OrderBookEntry::new(dec!(100), dec!(0.01))]);
        assert_eq!(book.asks, vec![OrderBookEntry::new(dec!(101), dec!(0.02))]);
        assert_eq!(book.nonce, Some(7));
        assert_eq!(book.timestamp, None);
    }

    #[test]
    fn test_parse_market_offline_is_kept() {
        let index = index();
        let market = parse_market(
            &json!({
                "symbol": "REPV2-BTC",
                "baseCurrencySymbol": "REPV2",
                "quoteCurrencySymbol": "BTC",
                "precision": 6,
                "status": "OFFLINE"
            }),
            &index,
        )
        .unwrap();
        assert_eq!(market.symbol, "REP/BTC");
        assert_eq!(market.active, Some(false));
        assert_eq!(market.precision.price, Some(dec!(0.000001)));
    }

    #[test]
    fn test_safe_market_round_trip() {
        let index = index();
        let market = index.market("ETH/BTC").unwrap();
        assert_eq!(
            index.safe_market(&market.id, None, Some(DELIMITER)).symbol,
            market.symbol
        );
    }

    #[test]
    fn test_parse_ticker() {
        let index = index();
        let info = json!({
            "symbol": "ETH-BTC",
            "high": "0.07",
            "low": "0.06",
            "volume": "100",
            "quoteVolume": "6.5",
            "percentChange": "-1.5",
            "updatedAt": "2023-11-14T22:13:20Z"
        });
        let ticker = parse_ticker(&info, None, &index).unwrap();
        assert_eq!(ticker.symbol, "ETH/BTC");
        assert_eq!(ticker.timestamp, Some(1_700_000_000_000));
        assert!(ticker.high.unwrap() >= ticker.low.unwrap());
        assert_eq!(ticker.vwap, Some(dec!(0.065)));
        // 같은 입력 -> 같은 출력
        assert_eq!(ticker, parse_ticker(&info, None, &index).unwrap());
    }

    #[test]
    fn test_parse_trade_maker_side_flipped() {
        let index = index();
        let trade = parse_trade(
            &json!({
                "id": "t1",
                "marketSymbol": "ETH-BTC",
                "executedAt": "2023-11-14T22:13:20Z",
                "quantity": "2",
                "rate": "0.05",
                "orderId": "o1",
                "commission": "0.0001",
                "isTaker": false,
                "takerSide": "BUY"
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(trade.side, Some(Side::Sell));
        assert_eq!(trade.taker_or_maker, Some(TakerOrMaker::Maker));
        assert_eq!(trade.cost, Some(dec!(0.1)));
        assert_eq!(trade.fee.unwrap().currency.as_deref(), Some("BTC"));
    }

    #[test]
    fn test_parse_without_market_leaves_symbol_empty() {
        let index = index();
        let trade = parse_trade(
            &json!({"id": "t2", "quantity": "1", "rate": "2", "commission": "0.01"}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(trade.symbol, None);
        assert_eq!(trade.fee.unwrap().currency, None);

        let order = parse_order(
            &json!({"id": "o2", "direction": "BUY", "quantity": "1", "commission": "0.01"}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.symbol, None);
        assert_eq!(order.fee.unwrap().currency, None);
    }

    #[test]
    fn test_parse_order_conditional_fields() {
        let index = index();
        let order = parse_order(
            &json!({
                "id": "c1",
                "marketSymbol": "ETH-BTC",
                "operand": "LTE",
                "triggerPrice": "0.04",
                "status": "OPEN",
                "createdAt": "2023-11-14T22:13:20Z",
                "orderToCreate": {
                    "marketSymbol": "ETH-BTC",
                    "direction": "SELL",
                    "type": "LIMIT",
                    "quantity": "1.5",
                    "limit": "0.039",
                    "timeInForce": "GOOD_TIL_CANCELLED"
                }
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.side, Some(Side::Sell));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.amount, Some(dec!(1.5)));
        assert_eq!(order.price, Some(dec!(0.039)));
        assert_eq!(order.trigger_price, Some(dec!(0.04)));
        assert_eq!(order.time_in_force, Some(TimeInForce::Gtc));
        assert_eq!(order.post_only, Some(false));
        assert_eq!(order.status, Some(OrderStatus::Open));
    }

    #[test]
    fn test_parse_order_derives_average() {
        let index = index();
        let order = parse_order(
            &json!({
                "id": "o1",
                "marketSymbol": "ETH-BTC",
                "direction": "BUY",
                "type": "LIMIT",
                "quantity": "2",
                "limit": "0.06",
                "timeInForce": "POST_ONLY_GOOD_TIL_CANCELLED",
                "fillQuantity": "2",
                "commission": "0.0003",
                "proceeds": "0.118",
                "status": "CLOSED",
                "createdAt": "2023-11-14T22:13:20Z",
                "closedAt": "2023-11-14T22:14:20Z"
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.remaining, Some(dec!(0)));
        assert_eq!(order.average, Some(dec!(0.059)));
        assert_eq!(order.post_only, Some(true));
        assert_eq!(order.last_trade_timestamp, Some(1_700_000_060_000));
        assert_eq!(order.status, Some(OrderStatus::Closed));
    }

    #[test]
    fn test_order_status_total() {
        for raw in ["CLOSED", "OPEN", "CANCELLED", "CANCELED"] {
            assert!(!matches!(parse_order_status(raw), OrderStatus::Other(_)));
        }
        assert_eq!(
            parse_order_status("PENDING_NEW"),
            OrderStatus::Other("PENDING_NEW".into())
        );
    }

    #[test]
    fn test_parse_transaction_heuristic() {
        let index = index();
        let deposit = parse_transaction(
            &json!({
                "id": "d1",
                "currencySymbol": "ETH",
                "quantity": "1",
                "cryptoAddress": "0xabc",
                "source": "BLOCKCHAIN",
                "txId": "0xhash",
                "updatedAt": "2023-11-14T22:13:20Z",
                "status": "COMPLETED"
            }),
            &index,
        )
        .unwrap();
        assert_eq!(deposit.tx_type, Some(TransactionType::Deposit));
        assert_eq!(deposit.status, Some(TransactionStatus::Ok));
        assert_eq!(deposit.address_from.as_deref(), Some("0xabc"));
        assert_eq!(deposit.fee.unwrap().cost, Some(Decimal::ZERO));
        assert_eq!(deposit.timestamp, Some(1_700_000_000_000));

        let withdrawal = parse_transaction(
            &json!({
                "id": "w1",
                "currencySymbol": "ETH",
                "quantity": "1",
                "cryptoAddress": "0xdef",
                "txCost": "0.005",
                "createdAt": "2023-11-14T22:13:20Z",
                "status": "AUTHORIZED"
            }),
            &index,
        )
        .unwrap();
        assert_eq!(withdrawal.tx_type, Some(TransactionType::Withdrawal));
        assert_eq!(withdrawal.status, Some(TransactionStatus::Pending));
        assert_eq!(withdrawal.address_to.as_deref(), Some("0xdef"));
    }

    #[test]
    fn test_parse_balance_derives_used() {
        let index = index();
        let balances = parse_balance(
            &json!([{"currencySymbol": "BTC", "total": "1.5", "available": "1.0"}]),
            &index,
        )
        .unwrap();
        assert_eq!(balances.entries["BTC"].used, Some(dec!(0.5)));
    }

    #[test]
    fn test_parse_ohlcv() {
        let candle = parse_ohlcv(&json!({
            "startsAt": "2023-11-14T22:13:20Z",
            "open": "1", "high": "3", "low": "0.5", "close": "2", "volume": "10"
        }))
        .unwrap()
        .unwrap();
        assert_eq!(candle.timestamp, 1_700_000_000_000);
        assert_eq!(candle.high, dec!(3));
    }
}
