//! BitoPro v3 응답 -> 통합 모델. 대부분 `data` 필드 안에 들어 있다.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use interface::{
    de,
    market::parse_precision,
    Balance, Balances, Currency, CurrencyLimits, ExchangeError, Fee, Market, MarketIndex,
    MarketLimits, MarketPrecision, MinMax, Ohlcv, Order, OrderBook, OrderBookEntry, OrderStatus,
    OrderType, Side, TakerOrMaker, Ticker, TimeInForce, Trade, TradingFee, Transaction, TransactionStatus,
    TransactionType,
};

use crate::request::decode;

const DELIMITER: &str = "_";

/// `data` 필드. 없으면 기본값
pub fn data(response: &Value) -> Value {
    response.get("data").cloned().unwrap_or(Value::Null)
}

/// 배열 `data`. null 이면 빈 배열
pub fn data_rows(response: &Value) -> Result<Vec<Value>, ExchangeError> {
    match response.get("data") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(rows) => decode("data", rows.clone()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCurrency {
    currency: String,
    #[serde(default, deserialize_with = "de::opt_bool")]
    deposit: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    withdraw: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    withdraw_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_withdraw: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    max_withdraw: Option<Decimal>,
}

pub fn parse_currency(info: &Value, index: &MarketIndex) -> Result<Currency, ExchangeError> {
    let raw: RawCurrency = decode("currency", info.clone())?;
    let active = match (raw.deposit, raw.withdraw) {
        (Some(deposit), Some(withdraw)) => Some(deposit && withdraw),
        _ => None,
    };
    Ok(Currency {
        code: index.safe_currency_code(&raw.currency),
        id: raw.currency,
        name: None,
        currency_type: None,
        active,
        deposit: raw.deposit,
        withdraw: raw.withdraw,
        fee: raw.withdraw_fee,
        precision: None,
        limits: CurrencyLimits {
            withdraw: MinMax::new(raw.min_withdraw, raw.max_withdraw),
            ..Default::default()
        },
        networks: Default::default(),
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    pair: String,
    base: String,
    quote: String,
    #[serde(default, deserialize_with = "de::opt_bool")]
    maintain: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    base_precision: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    quote_precision: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_limit_base_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    max_limit_base_amount: Option<Decimal>,
}

/// 점검 중(`maintain`)인 마켓은 비활성으로 남긴다
pub fn parse_market(info: &Value, index: &MarketIndex) -> Result<Market, ExchangeError> {
    let raw: RawMarket = decode("market", info.clone())?;
    let base = index.safe_currency_code(&raw.base);
    let quote = index.safe_currency_code(&raw.quote);
    Ok(Market {
        id: raw.pair,
        symbol: format!("{}/{}", base, quote),
        base,
        quote,
        base_id: raw.base,
        quote_id: raw.quote,
        active: Some(!raw.maintain.unwrap_or(false)),
        precision: MarketPrecision {
            amount: raw.base_precision.and_then(parse_precision),
            price: raw.quote_precision.and_then(parse_precision),
        },
        limits: MarketLimits {
            amount: MinMax::new(raw.min_limit_base_amount, raw.max_limit_base_amount),
            ..Default::default()
        },
        maker: None,
        taker: None,
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high24hr: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low24hr: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price_change24hr: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    volume24hr: Option<Decimal>,
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
        timestamp: None,
        high: raw.high24hr,
        low: raw.low24hr,
        close: raw.last_price,
        last: raw.last_price,
        percentage: raw.price_change24hr,
        base_volume: raw.volume24hr,
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
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
}

fn levels(raw: Vec<RawLevel>) -> Vec<OrderBookEntry> {
    raw.into_iter()
        .filter_map(|level| Some(OrderBookEntry::new(level.price?, level.amount?)))
        .collect()
}

pub fn parse_order_book(info: &Value, symbol: &str) -> Result<OrderBook, ExchangeError> {
    let raw: RawOrderBook = decode("order book", info.clone())?;
    Ok(OrderBook::new(symbol, levels(raw.bids), levels(raw.asks), None, info.clone()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    #[serde(default, deserialize_with = "de::opt_string")]
    trade_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    order_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    is_buyer: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    base_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
    #[serde(default)]
    fee_symbol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    is_taker: Option<bool>,
}

/// 공개 체결은 초 단위, 내 체결(tradeId 있음)은 ms 단위 timestamp
pub fn parse_trade(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Trade, ExchangeError> {
    let raw: RawTrade = decode("trade", info.clone())?;
    let timestamp = match raw.trade_id {
        Some(_) => raw.timestamp,
        None => raw.timestamp.map(|ts| ts * 1000),
    };
    let symbol = match raw.pair.as_deref() {
        Some(id) => Some(index.safe_symbol(id, market, Some(DELIMITER))),
        None => market.map(|m| m.symbol.clone()),
    };
    let side = match raw.action.as_deref() {
        Some(action) => Side::parse_loose(action),
        None if raw.is_buyer.unwrap_or(false) => Some(Side::Buy),
        None => Some(Side::Sell),
    };
    let fee = raw.fee.map(|cost| Fee {
        cost: Some(cost),
        currency: raw
            .fee_symbol
            .as_deref()
            .map(|id| index.safe_currency_code(id)),
        rate: None,
    });
    Ok(Trade {
        id: raw.trade_id,
        order: raw.order_id,
        timestamp,
        symbol,
        side,
        order_type: raw.order_type.as_deref().map(parse_order_type),
        taker_or_maker: raw.is_taker.map(|taker| {
            if taker {
                TakerOrMaker::Taker
            } else {
                TakerOrMaker::Maker
            }
        }),
        price: raw.price,
        amount: raw.amount.or(raw.base_amount),
        cost: None,
        fee,
        info: info.clone(),
    }
    .complete())
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
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

pub fn parse_ohlcv(info: &Value) -> Result<Option<Ohlcv>, ExchangeError> {
    let raw: RawCandle = decode("candle", info.clone())?;
    Ok((|| {
        Some(Ohlcv {
            timestamp: raw.timestamp?,
            open: raw.open?,
            high: raw.high?,
            low: raw.low?,
            close: raw.close?,
            volume: raw.volume?,
        })
    })())
}

/// 거래가 없던 구간은 캔들이 빠져서 온다. 직전 종가로 거래량 0 캔들을 채워 넣는다.
/// 시작 시각은 since (주기로 내림 정렬된 값) 또는 첫 캔들.
pub fn fill_missing_candles(
    candles: Vec<Ohlcv>,
    distance_ms: i64,
    since: Option<i64>,
    limit: usize,
) -> Vec<Ohlcv> {
    if candles.is_empty() {
        return candles;
    }
    let mut copy_from = candles[0];
    let mut timestamp = since.unwrap_or(copy_from.timestamp);
    let mut result: Vec<Ohlcv> = Vec::new();
    let mut i = 0;
    while result.len() < limit && i < candles.len() {
        let candle = candles[i];
        if candle.timestamp < timestamp {
            // 정렬 기준보다 이른 캔들은 건너뛴다
            i += 1;
            continue;
        }
        if candle.timestamp == timestamp {
            result.push(candle);
            i += 1;
        } else {
            result.push(Ohlcv {
                timestamp,
                open: copy_from.close,
                high: copy_from.close,
                low: copy_from.close,
                close: copy_from.close,
                volume: Decimal::ZERO,
            });
        }
        copy_from = result[result.len() - 1];
        timestamp += distance_ms;
    }
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeeRate {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    maker_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    taker_fee: Option<Decimal>,
}

/// 기본 등급(`tradingFeeRate[0]`) 수수료를 모든 마켓에 적용한다
pub fn parse_trading_fees(
    info: &Value,
    symbols: Vec<String>,
) -> Result<BTreeMap<String, TradingFee>, ExchangeError> {
    let first = info
        .get("tradingFeeRate")
        .and_then(|rates| rates.get(0))
        .cloned()
        .ok_or_else(|| ExchangeError::Other(format!("BitoPro fees without tradingFeeRate: {}", info)))?;
    let rate: RawFeeRate = decode("trading fee", first.clone())?;
    Ok(symbols
        .into_iter()
        .map(|symbol| {
            let fee = TradingFee {
                symbol: symbol.clone(),
                maker: rate.maker_fee,
                taker: rate.taker_fee,
                percentage: Some(true),
                tier_based: Some(true),
                info: first.clone(),
            };
            (symbol, fee)
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    currency: String,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    available: Option<Decimal>,
}

pub fn parse_balance(info: &Value, index: &MarketIndex) -> Result<Balances, ExchangeError> {
    let rows: Vec<RawBalance> = decode("balances", data(info))?;
    let mut balances = Balances::new(info.clone());
    for row in rows {
        balances.insert(
            index.safe_currency_code(&row.currency),
            Balance {
                free: row.available,
                used: None,
                total: row.amount,
            },
        );
    }
    Ok(balances)
}

pub fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "-1" | "0" | "1" => OrderStatus::Open,
        "2" | "3" => OrderStatus::Closed,
        "4" | "6" => OrderStatus::Canceled,
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    order_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    created_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    updated_timestamp: Option<i64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    original_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    avg_execution_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    executed_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    remaining_amount: Option<Decimal>,
    #[serde(default)]
    time_in_force: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
    #[serde(default)]
    fee_symbol: Option<String>,
}

pub fn parse_order(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Order, ExchangeError> {
    let raw: RawOrder = decode("order", info.clone())?;
    let symbol = match raw.pair.as_deref() {
        Some(id) => Some(index.safe_symbol(id, market, Some(DELIMITER))),
        None => market.map(|m| m.symbol.clone()),
    };
    let time_in_force = raw.time_in_force.as_deref().map(|tif| match tif {
        "POST_ONLY" => TimeInForce::Po,
        "GTC" => TimeInForce::Gtc,
        other => TimeInForce::Other(other.to_string()),
    });
    let post_only = (time_in_force == Some(TimeInForce::Po)).then_some(true);
    // 수수료 0 은 없는 것으로 본다
    let fee = raw.fee.filter(|cost| *cost > Decimal::ZERO).map(|cost| Fee {
        cost: Some(cost),
        currency: raw
            .fee_symbol
            .as_deref()
            .map(|id| index.safe_currency_code(id)),
        rate: None,
    });
    Ok(Order {
        id: raw.id.or(raw.order_id),
        client_order_id: None,
        timestamp: raw.timestamp.or(raw.created_timestamp),
        last_trade_timestamp: raw.updated_timestamp,
        symbol,
        side: raw.action.as_deref().and_then(Side::parse_loose),
        order_type: raw.order_type.as_deref().map(parse_order_type),
        time_in_force,
        post_only,
        price: raw.price,
        trigger_price: None,
        amount: raw.amount.or(raw.original_amount),
        filled: raw.executed_amount,
        remaining: raw.remaining_amount,
        cost: None,
        average: raw.avg_execution_price,
        status: raw.status.as_deref().map(parse_order_status),
        fee,
        trades: Vec::new(),
        info: info.clone(),
    }
    .complete())
}

/// 취소 응답 `{"data": {"BTC_USDT": ["id", ...]}}` -> 취소된 주문 목록
pub fn parse_canceled_ids(info: &Value, index: &MarketIndex) -> Vec<Order> {
    let Some(Value::Object(pairs)) = info.get("data") else {
        return Vec::new();
    };
    let mut orders = Vec::new();
    for (pair, ids) in pairs {
        let symbol = index.safe_symbol(&pair.to_lowercase(), None, Some(DELIMITER));
        let Some(ids) = ids.as_array() else { continue };
        for id in ids.iter().filter_map(de::value_string) {
            orders.push(Order {
                id: Some(id),
                symbol: Some(symbol.clone()),
                status: Some(OrderStatus::Canceled),
                info: info.clone(),
                ..Default::default()
            });
        }
    }
    orders
}

pub fn parse_transaction_status(raw: &str) -> TransactionStatus {
    match raw {
        "COMPLETE" => TransactionStatus::Ok,
        "INVALID" | "FAILED" | "EXPIRED" | "CANCELLED" => TransactionStatus::Failed,
        "PROCESSING" | "WAIT_PROCESS" | "EMAIL_VERIFICATION" | "WAIT_CONFIRMATION" => {
            TransactionStatus::Pending
        }
        other => TransactionStatus::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default, deserialize_with = "de::opt_string")]
    serial: Option<String>,
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    coin: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    total: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
}

/// `network_code` 는 protocol id 를 통합 네트워크 이름으로 바꾼다. MAIN 은 통화 코드.
pub fn parse_transaction(
    info: &Value,
    tx_type: Option<TransactionType>,
    code: Option<&str>,
    index: &MarketIndex,
    network_code: impl Fn(&str) -> String,
) -> Result<Transaction, ExchangeError> {
    let raw: RawTransaction = decode("transaction", info.clone())?;
    let currency = raw
        .coin
        .as_deref()
        .map(|id| index.safe_currency_code(id))
        .or_else(|| code.map(str::to_string));
    let network = raw.protocol.as_deref().map(|protocol| match protocol {
        "MAIN" => currency.clone().unwrap_or_else(|| protocol.to_string()),
        other => network_code(other),
    });
    Ok(Transaction {
        id: raw.serial,
        txid: raw.txid,
        timestamp: raw.timestamp,
        network,
        address: raw.address.clone(),
        address_from: None,
        address_to: raw.address,
        tag: raw.message.clone(),
        tag_from: None,
        tag_to: raw.message,
        tx_type,
        amount: raw.total,
        fee: Some(Fee {
            cost: raw.fee,
            currency: currency.clone(),
            rate: None,
        }),
        currency,
        status: raw.status.as_deref().map(parse_transaction_status),
        updated: None,
        comment: None,
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
        let mut index = MarketIndex::new(ExchangeId::Bitopro, &[]);
        let market = parse_market(
            &json!({
                "pair": "btc_twd",
                "base": "btc",
                "quote": "twd",
                "basePrecision": "8",
                "quotePrecision": "0",
                "minLimitBaseAmount": "0.0001",
                "maxLimitBaseAmount": "1000",
                "maintain": false
            }),
            &index,
        )
        .unwrap();
        index.set_markets(vec![market]);
        index
    }

    fn candle(timestamp: i64, close: Decimal, volume: Decimal) -> Ohlcv {
        Ohlcv {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn test_parse_market() {
        let index = index();
        let market = index.market("BTC/TWD").unwrap();
        assert_eq!(market.id, "btc_twd");
        assert_eq!(market.active, Some(true));
        assert_eq!(market.precision.amount, Some(dec!(0.00000001)));
        assert_eq!(market.precision.price, Some(dec!(1)));

        let maintained = parse_market(
            &json!({"pair": "eth_twd", "base": "eth", "quote": "twd", "maintain": true}),
            &index,
        )
        .unwrap();
        assert_eq!(maintained.active, Some(false));
    }

    #[test]
    fn test_parse_currency_active_needs_both() {
        let index = index();
        let currency = parse_currency(
            &json!({"currency": "btc", "withdrawFee": "0.0005", "minWithdraw": "0.001",
                    "maxWithdraw": "10", "deposit": true, "withdraw": false}),
            &index,
        )
        .unwrap();
        assert_eq!(currency.code, "BTC");
        assert_eq!(currency.active, Some(false));
        assert_eq!(currency.limits.withdraw.max, Some(dec!(10)));
    }

    #[test]
    fn test_parse_ticker() {
        let index = index();
        let ticker = parse_ticker(
            &json!({"pair": "btc_twd", "lastPrice": "1000000", "isBuyer": true,
                    "priceChange24hr": "2.5", "volume24hr": "10", "high24hr": "1010000", "low24hr": "990000"}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(ticker.symbol, "BTC/TWD");
        assert_eq!(ticker.percentage, Some(dec!(2.5)));
        assert_eq!(ticker.base_volume, Some(dec!(10)));
    }

    #[test]
    fn test_trade_timestamps() {
        let index = index();
        let public = parse_trade(
            &json!({"timestamp": 1700000000, "price": "100", "amount": "1", "isBuyer": false}),
            index.market("BTC/TWD"),
            &index,
        )
        .unwrap();
        assert_eq!(public.timestamp, Some(1_700_000_000_000));
        assert_eq!(public.side, Some(Side::Sell));
        assert_eq!(public.cost, Some(dec!(100)));

        let mine = parse_trade(
            &json!({"tradeId": "t1", "orderId": "o1", "timestamp": 1700000000123u64, "pair": "btc_twd",
                    "price": "100", "action": "BUY", "baseAmount": "2", "fee": "0.1",
                    "feeSymbol": "btc", "isTaker": true}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(mine.timestamp, Some(1_700_000_000_123));
        assert_eq!(mine.amount, Some(dec!(2)));
        assert_eq!(mine.taker_or_maker, Some(TakerOrMaker::Taker));
        assert_eq!(mine.fee.unwrap().currency.as_deref(), Some("BTC"));
    }

    #[test]
    fn test_fill_missing_candles() {
        let minute = 60_000;
        let candles = vec![
            candle(0, dec!(10), dec!(1)),
            candle(3 * minute, dec!(12), dec!(2)),
        ];
        let filled = fill_missing_candles(candles, minute, None, 10);
        let timestamps: Vec<i64> = filled.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![0, minute, 2 * minute, 3 * minute]);
        assert_eq!(filled[1].close, dec!(10));
        assert_eq!(filled[1].volume, Decimal::ZERO);
        assert_eq!(filled[3].volume, dec!(2));

        // since 가 첫 캔들보다 앞이면 앞쪽도 채운다
        let candles = vec![candle(2 * minute, dec!(5), dec!(1))];
        let filled = fill_missing_candles(candles, minute, Some(0), 2);
        assert_eq!(filled.len(), 2);
        assert_eq!(filled[0].close, dec!(5));
        assert_eq!(filled[0].timestamp, 0);

        assert!(fill_missing_candles(Vec::new(), minute, None, 5).is_empty());
    }

    #[test]
    fn test_parse_trading_fees() {
        let fees = parse_trading_fees(
            &json!({"tradingFeeRate": [{"rank": 0, "makerFee": "0.001", "takerFee": "0.002"}]}),
            vec!["BTC/TWD".to_string(), "ETH/TWD".to_string()],
        )
        .unwrap();
        assert_eq!(fees.len(), 2);
        assert_eq!(fees["ETH/TWD"].taker, Some(dec!(0.002)));
        assert!(parse_trading_fees(&json!({}), Vec::new()).is_err());
    }

    #[test]
    fn test_parse_order() {
        let index = index();
        let order = parse_order(
            &json!({
                "id": "123",
                "pair": "btc_twd",
                "price": "100",
                "avgExecutionPrice": "100",
                "action": "BUY",
                "type": "LIMIT",
                "timestamp": 1700000000000u64,
                "updatedTimestamp": 1700000001000u64,
                "status": 2,
                "originalAmount": "2",
                "remainingAmount": "0",
                "executedAmount": "2",
                "fee": "0.002",
                "feeSymbol": "btc",
                "timeInForce": "POST_ONLY"
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.symbol.as_deref(), Some("BTC/TWD"));
        assert_eq!(order.status, Some(OrderStatus::Closed));
        assert_eq!(order.post_only, Some(true));
        assert_eq!(order.cost, Some(dec!(200)));
        assert_eq!(order.fee.as_ref().and_then(|f| f.currency.as_deref()), Some("BTC"));
        assert_eq!(parse_order_status("5"), OrderStatus::Other("5".to_string()));
    }

    #[test]
    fn test_parse_order_cancel_response_has_no_status() {
        let index = index();
        let market = index.market("BTC/TWD").unwrap().clone();
        let order = parse_order(
            &json!({"orderId": "8777138788", "action": "SELL", "timestamp": 1644899002465u64,
                    "price": "15000", "amount": "0.01"}),
            Some(&market),
            &index,
        )
        .unwrap();
        assert_eq!(order.id.as_deref(), Some("8777138788"));
        assert_eq!(order.status, None);
        assert_eq!(order.order_type, None);
        assert_eq!(order.filled, None);

        let order = parse_order(&json!({"orderId": "1"}), Some(&market), &index).unwrap();
        assert_eq!(order.side, None);
        assert_eq!(order.amount, None);
        assert_eq!(order.price, None);
    }

    #[test]
    fn test_parse_canceled_ids() {
        let index = index();
        let orders = parse_canceled_ids(
            &json!({"data": {"BTC_TWD": ["1", "2"]}}),
            &index,
        );
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].symbol.as_deref(), Some("BTC/TWD"));
        assert_eq!(orders[1].status, Some(OrderStatus::Canceled));
    }

    #[test]
    fn test_parse_transaction_network() {
        let index = index();
        let network_code = |id: &str| if id == "TRX" { "TRC20".to_string() } else { id.to_string() };
        let tx = parse_transaction(
            &json!({"serial": "2020", "timestamp": 1700000000000u64, "address": "addr",
                    "message": "memo", "status": "WAIT_PROCESS", "protocol": "TRX",
                    "total": "10", "fee": "1", "coin": "usdt"}),
            Some(TransactionType::Withdrawal),
            None,
            &index,
            network_code,
        )
        .unwrap();
        assert_eq!(tx.network.as_deref(), Some("TRC20"));
        assert_eq!(tx.status, Some(TransactionStatus::Pending));
        assert_eq!(tx.currency.as_deref(), Some("USDT"));

        let tx = parse_transaction(
            &json!({"serial": "1", "protocol": "MAIN", "status": "COMPLETE"}),
            Some(TransactionType::Deposit),
            Some("BTC"),
            &index,
            network_code,
        )
        .unwrap();
        assert_eq!(tx.network.as_deref(), Some("BTC"));
        assert_eq!(tx.status, Some(TransactionStatus::Ok));
    }
}
