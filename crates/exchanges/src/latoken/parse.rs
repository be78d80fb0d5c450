//! Latoken v2 응답 -> 통합 모델. 통화와 마켓은 UUID 로 참조된다.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use interface::{
    de,
    market::parse_precision,
    Balance, Balances, Currency, CurrencyLimits, ExchangeError, Fee, Market, MarketIndex,
    MarketLimits, MarketPrecision, MinMax, Order, OrderBook, OrderBookEntry, OrderStatus,
    OrderType, Side, TakerOrMaker, Ticker, TimeInForce, Trade, TradingFee, Transaction,
    TransactionStatus, TransactionType,
};

use crate::request::decode;

/// "CURRENCY_TYPE_CRYPTO" -> "crypto", "ORDER_SIDE_BUY" -> "buy"
fn last_part_lower(raw: &str) -> String {
    raw.rsplit('_').next().unwrap_or(raw).to_lowercase()
}

/// "USDT" -> "Usdt"
fn capitalize(code: &str) -> String {
    let lower = code.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCurrency {
    id: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    currency_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    decimals: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_transfer_amount: Option<Decimal>,
}

pub fn parse_currency(info: &Value, index: &MarketIndex) -> Result<Currency, ExchangeError> {
    let raw: RawCurrency = decode("currency", info.clone())?;
    let code = index.common_currency_code(raw.tag.as_deref().unwrap_or(&raw.id));
    Ok(Currency {
        id: raw.id,
        code,
        name: raw.name,
        currency_type: raw.currency_type.as_deref().map(last_part_lower),
        active: Some(raw.status.as_deref() == Some("CURRENCY_STATUS_ACTIVE")),
        deposit: None,
        withdraw: None,
        fee: raw.fee,
        precision: raw.decimals.and_then(parse_precision),
        limits: CurrencyLimits {
            amount: MinMax::new(raw.min_transfer_amount, None),
            ..Default::default()
        },
        networks: Default::default(),
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    id: String,
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price_tick: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity_tick: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_order_quantity: Option<Decimal>,
}

/// 통화 인덱스에서 찾을 수 없는 UUID 가 있으면 None (마켓 목록에서 제외)
pub fn parse_market(info: &Value, index: &MarketIndex) -> Result<Option<Market>, ExchangeError> {
    let raw: RawMarket = decode("market", info.clone())?;
    let (Some(base), Some(quote)) = (
        index.currency_by_id(&raw.base_currency),
        index.currency_by_id(&raw.quote_currency),
    ) else {
        return Ok(None);
    };
    let (base, quote) = (base.code.clone(), quote.code.clone());
    // 비용 한도 키가 호가 통화 이름을 포함한다 (minOrderCostUsdt)
    let quote_key = capitalize(&quote);
    let cost_limit = |prefix: &str| {
        info.get(format!("{}{}", prefix, quote_key))
            .and_then(de::value_decimal)
    };
    Ok(Some(Market {
        id: raw.id,
        symbol: format!("{}/{}", base, quote),
        base,
        quote,
        base_id: raw.base_currency,
        quote_id: raw.quote_currency,
        active: Some(raw.status.as_deref() == Some("PAIR_STATUS_ACTIVE")),
        precision: MarketPrecision {
            amount: raw.quantity_tick,
            price: raw.price_tick,
        },
        limits: MarketLimits {
            amount: MinMax::new(raw.min_order_quantity, None),
            price: MinMax::default(),
            cost: MinMax::new(cost_limit("minOrderCost"), cost_limit("maxOrderCost")),
        },
        maker: None,
        taker: None,
        info: info.clone(),
    }))
}

/// "baseUUID/quoteUUID" 또는 base/quote 통화 id 쌍을 통합 심볼로
fn symbol_from_ids(base_id: &str, quote_id: &str, index: &MarketIndex) -> String {
    format!(
        "{}/{}",
        index.safe_currency_code(base_id),
        index.safe_currency_code(quote_id)
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    change24h: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    volume24h: Option<Decimal>,
}

/// 응답에 시각이 없어서 timestamp 는 비워 둔다
pub fn parse_ticker(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Ticker, ExchangeError> {
    let raw: RawTicker = decode("ticker", info.clone())?;
    let symbol = match raw.symbol.as_deref().and_then(|id| id.split_once('/')) {
        Some((base_id, quote_id)) => match market {
            Some(market) if market.base_id == base_id && market.quote_id == quote_id => {
                market.symbol.clone()
            }
            _ => symbol_from_ids(base_id, quote_id, index),
        },
        None => market.map(|m| m.symbol.clone()).unwrap_or_default(),
    };
    Ok(Ticker {
        symbol,
        timestamp: None,
        high: raw.high,
        low: raw.low,
        close: raw.last_price,
        last: raw.last_price,
        change: raw.change24h,
        quote_volume: raw.volume24h,
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
    quantity: Option<Decimal>,
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
        .filter_map(|level| Some(OrderBookEntry::new(level.price?, level.quantity?)))
        .collect()
}

pub fn parse_order_book(info: &Value, symbol: &str) -> Result<OrderBook, ExchangeError> {
    let raw: RawOrderBook = decode("order book", info.clone())?;
    Ok(OrderBook::new(symbol, levels(raw.bid), levels(raw.ask), None, info.clone()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    order: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    cost: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    maker_buyer: Option<bool>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(default)]
    quote_currency: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
}

pub fn parse_trade(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Trade, ExchangeError> {
    let raw: RawTrade = decode("trade", info.clone())?;
    let maker_buyer = raw.maker_buyer.unwrap_or(false);
    let side = match raw.direction.as_deref() {
        Some("TRADE_DIRECTION_BUY") => Some(Side::Buy),
        Some("TRADE_DIRECTION_SELL") => Some(Side::Sell),
        Some(other) => Side::parse_loose(other),
        None if maker_buyer => Some(Side::Sell),
        None => Some(Side::Buy),
    };
    let taker_or_maker = if maker_buyer && side == Some(Side::Buy) {
        TakerOrMaker::Maker
    } else {
        TakerOrMaker::Taker
    };
    let (symbol, quote) = match (raw.base_currency.as_deref(), raw.quote_currency.as_deref()) {
        (Some(base_id), Some(quote_id)) => (
            Some(symbol_from_ids(base_id, quote_id, index)),
            Some(index.safe_currency_code(quote_id)),
        ),
        _ => (
            market.map(|m| m.symbol.clone()),
            market.map(|m| m.quote.clone()),
        ),
    };
    let fee = raw.fee.map(|cost| Fee {
        cost: Some(cost),
        currency: quote,
        rate: None,
    });
    Ok(Trade {
        id: raw.id,
        order: raw.order,
        timestamp: raw.timestamp,
        symbol,
        side,
        order_type: None,
        taker_or_maker: Some(taker_or_maker),
        price: raw.price,
        amount: raw.quantity,
        cost: raw.cost,
        fee,
        info: info.clone(),
    }
    .complete())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTradingFee {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    maker_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    taker_fee: Option<Decimal>,
}

pub fn parse_trading_fee(info: &Value, market: &Market) -> Result<TradingFee, ExchangeError> {
    let raw: RawTradingFee = decode("trading fee", info.clone())?;
    Ok(TradingFee {
        symbol: market.symbol.clone(),
        maker: raw.maker_fee,
        taker: raw.taker_fee,
        percentage: None,
        tier_based: None,
        info: info.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccount {
    #[serde(default, rename = "type")]
    account_type: Option<String>,
    currency: String,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    available: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    blocked: Option<Decimal>,
}

/// 계정 종류(ACCOUNT_TYPE_SPOT 등)가 일치하는 행만 합친다
pub fn parse_balance(
    info: &Value,
    account_type: &str,
    index: &MarketIndex,
) -> Result<Balances, ExchangeError> {
    let rows: Vec<RawAccount> = decode("accounts", info.clone())?;
    let mut balances = Balances::new(info.clone());
    for row in rows
        .into_iter()
        .filter(|row| row.account_type.as_deref() == Some(account_type))
    {
        if let Some(ts) = row.timestamp {
            balances.timestamp = Some(balances.timestamp.map_or(ts, |max| max.max(ts)));
        }
        balances.insert(
            index.safe_currency_code(&row.currency),
            Balance {
                free: row.available,
                used: row.blocked,
                total: None,
            },
        );
    }
    Ok(balances)
}

pub fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "ORDER_STATUS_PLACED" => OrderStatus::Open,
        "ORDER_STATUS_CLOSED" => OrderStatus::Closed,
        "ORDER_STATUS_CANCELLED" => OrderStatus::Canceled,
        other => OrderStatus::Other(other.to_string()),
    }
}

fn parse_order_type(raw: &str) -> OrderType {
    match raw {
        "ORDER_TYPE_MARKET" => OrderType::Market,
        "ORDER_TYPE_LIMIT" => OrderType::Limit,
        other => OrderType::Other(other.to_string()),
    }
}

fn parse_time_in_force(raw: &str) -> TimeInForce {
    match raw {
        "ORDER_CONDITION_GOOD_TILL_CANCELLED" => TimeInForce::Gtc,
        "ORDER_CONDITION_IMMEDIATE_OR_CANCEL" => TimeInForce::Ioc,
        "ORDER_CONDITION_FILL_OR_KILL" => TimeInForce::Fok,
        other => TimeInForce::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(default)]
    quote_currency: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    filled: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    cost: Option<Decimal>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    client_order_id: Option<String>,
}

/// 주문 생성/취소 응답은 status 대신 message 로 결과를 알려 준다
pub fn parse_order(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Order, ExchangeError> {
    let raw: RawOrder = decode("order", info.clone())?;
    let symbol = match (raw.base_currency.as_deref(), raw.quote_currency.as_deref()) {
        (Some(base_id), Some(quote_id)) => Some(symbol_from_ids(base_id, quote_id, index)),
        _ => market.map(|m| m.symbol.clone()),
    };
    let mut status = raw.status.as_deref().map(parse_order_status);
    if let Some(message) = raw.message.as_deref() {
        if message.contains("cancel") {
            status = Some(OrderStatus::Canceled);
        } else if message.contains("accept") {
            status = Some(OrderStatus::Open);
        }
    }
    Ok(Order {
        id: raw.id,
        client_order_id: raw.client_order_id,
        timestamp: raw.timestamp,
        last_trade_timestamp: None,
        symbol,
        side: raw
            .side
            .as_deref()
            .and_then(|s| Side::parse_loose(&last_part_lower(s))),
        order_type: raw.order_type.as_deref().map(parse_order_type),
        time_in_force: raw.condition.as_deref().map(parse_time_in_force),
        post_only: None,
        price: raw.price,
        trigger_price: None,
        amount: raw.quantity,
        filled: raw.filled,
        remaining: None,
        cost: raw.cost,
        average: None,
        status,
        fee: None,
        trades: Vec::new(),
        info: info.clone(),
    }
    .complete())
}

pub fn parse_transaction_status(raw: &str) -> TransactionStatus {
    match raw {
        "TRANSACTION_STATUS_CONFIRMED" | "TRANSACTION_STATUS_EXECUTED" => TransactionStatus::Ok,
        "TRANSACTION_STATUS_CANCELLED" => TransactionStatus::Canceled,
        other => TransactionStatus::Other(other.to_string()),
    }
}

pub fn parse_transaction_type(raw: &str) -> Option<TransactionType> {
    match raw {
        "TRANSACTION_TYPE_DEPOSIT" => Some(TransactionType::Deposit),
        "TRANSACTION_TYPE_WITHDRAWAL" => Some(TransactionType::Withdrawal),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    timestamp: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "type")]
    tx_type: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default)]
    sender_address: Option<String>,
    #[serde(default)]
    recipient_address: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    transaction_fee: Option<Decimal>,
}

pub fn parse_transaction(info: &Value, index: &MarketIndex) -> Result<Transaction, ExchangeError> {
    let raw: RawTransaction = decode("transaction", info.clone())?;
    let code = raw.currency.as_deref().map(|id| index.safe_currency_code(id));
    let fee = raw.transaction_fee.map(|cost| Fee {
        cost: Some(cost),
        currency: code.clone(),
        rate: None,
    });
    Ok(Transaction {
        id: raw.id,
        txid: raw.transaction_hash,
        timestamp: raw.timestamp,
        network: None,
        address: raw.recipient_address.clone(),
        address_from: raw.sender_address,
        address_to: raw.recipient_address,
        tag: raw.memo.clone(),
        tag_from: None,
        tag_to: raw.memo,
        tx_type: raw.tx_type.as_deref().and_then(parse_transaction_type),
        amount: raw.amount,
        currency: code,
        status: raw.status.as_deref().map(parse_transaction_status),
        updated: None,
        comment: None,
        fee,
        info: info.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::ExchangeId;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const BTC_ID: &str = "92151d82-df98-4d88-9a4d-284fa9eca49f";
    const USDT_ID: &str = "0c3a106d-bde3-4c13-a26e-3fd2394529e5";

    fn index() -> MarketIndex {
        let mut index = MarketIndex::new(ExchangeId::Latoken, &[("TRADE", "Smart Trade Coin")]);
        let currencies = [
            json!({"id": BTC_ID, "tag": "BTC", "name": "Bitcoin", "type": "CURRENCY_TYPE_CRYPTO",
                   "status": "CURRENCY_STATUS_ACTIVE", "decimals": 8, "minTransferAmount": 0}),
            json!({"id": USDT_ID, "tag": "USDT", "name": "Tether", "type": "CURRENCY_TYPE_CRYPTO",
                   "status": "CURRENCY_STATUS_ACTIVE", "decimals": 6, "minTransferAmount": "1"}),
        ]
        .iter()
        .map(|c| parse_currency(c, &index).unwrap())
        .collect::<Vec<_>>();
        index.set_currencies(currencies);
        let market = parse_market(
            &json!({
                "id": "pair-1",
                "status": "PAIR_STATUS_ACTIVE",
                "baseCurrency": BTC_ID,
                "quoteCurrency": USDT_ID,
                "priceTick": "0.01",
                "quantityTick": "0.00001",
                "minOrderQuantity": "0.0001",
                "minOrderCostUsdt": "1",
                "maxOrderCostUsdt": "100000"
            }),
            &index,
        )
        .unwrap()
        .unwrap();
        index.set_markets(vec![market]);
        index
    }

    #[test]
    fn test_parse_currency() {
        let index = index();
        let usdt = index.currency("USDT").unwrap();
        assert_eq!(usdt.id, USDT_ID);
        assert_eq!(usdt.currency_type.as_deref(), Some("crypto"));
        assert_eq!(usdt.precision, Some(dec!(0.000001)));
        assert_eq!(usdt.limits.amount.min, Some(dec!(1)));
        assert_eq!(usdt.active, Some(true));
    }

    #[test]
    fn test_parse_market_resolves_uuids() {
        let index = index();
        let market = index.market("BTC/USDT").unwrap();
        assert_eq!(market.id, "pair-1");
        assert_eq!(market.base_id, BTC_ID);
        assert_eq!(market.limits.cost.min, Some(dec!(1)));
        assert_eq!(market.limits.cost.max, Some(dec!(100000)));
        assert_eq!(market.precision.amount, Some(dec!(0.00001)));

        let unknown = parse_market(
            &json!({"id": "pair-2", "baseCurrency": "nope", "quoteCurrency": USDT_ID}),
            &index,
        )
        .unwrap();
        assert!(unknown.is_none());
    }

    #[test]
    fn test_parse_ticker_symbol_from_uuid_pair() {
        let index = index();
        let ticker = parse_ticker(
            &json!({
                "symbol": format!("{}/{}", BTC_ID, USDT_ID),
                "baseCurrency": BTC_ID,
                "quoteCurrency": USDT_ID,
                "volume24h": "76411867.85",
                "change24h": "100",
                "lastPrice": "4426.9"
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(ticker.symbol, "BTC/USDT");
        assert_eq!(ticker.timestamp, None);
        assert_eq!(ticker.open, Some(dec!(4326.9)));
        assert_eq!(ticker.quote_volume, Some(dec!(76411867.85)));
    }

    #[test]
    fn test_parse_trade_direction_and_maker() {
        let index = index();
        let info = json!({
            "id": "t1",
            "timestamp": 1700000000000u64,
            "baseCurrency": BTC_ID,
            "quoteCurrency": USDT_ID,
            "price": "100",
            "quantity": "2",
            "cost": "200",
            "fee": "0.2",
            "order": "o1",
            "makerBuyer": true
        });
        let trade = parse_trade(&info, None, &index).unwrap();
        assert_eq!(trade.side, Some(Side::Sell));
        assert_eq!(trade.taker_or_maker, Some(TakerOrMaker::Taker));
        assert_eq!(trade.symbol.as_deref(), Some("BTC/USDT"));
        assert_eq!(trade.fee.unwrap().currency.as_deref(), Some("USDT"));

        let mut info = info;
        info["direction"] = json!("TRADE_DIRECTION_BUY");
        let trade = parse_trade(&info, None, &index).unwrap();
        assert_eq!(trade.side, Some(Side::Buy));
        assert_eq!(trade.taker_or_maker, Some(TakerOrMaker::Maker));
    }

    #[test]
    fn test_parse_balance_filters_account_type() {
        let index = index();
        let info = json!([
            {"type": "ACCOUNT_TYPE_WALLET", "timestamp": "1635920106506", "currency": USDT_ID,
             "available": "100", "blocked": "0"},
            {"type": "ACCOUNT_TYPE_SPOT", "timestamp": "1635920106504", "currency": USDT_ID,
             "available": "40", "blocked": "10"},
            {"type": "ACCOUNT_TYPE_SPOT", "timestamp": "1635920106510", "currency": BTC_ID,
             "available": "1", "blocked": "0"}
        ]);
        let balances = parse_balance(&info, "ACCOUNT_TYPE_SPOT", &index).unwrap();
        assert_eq!(balances.entries["USDT"].free, Some(dec!(40)));
        assert_eq!(balances.entries["USDT"].total, Some(dec!(50)));
        assert_eq!(balances.timestamp, Some(1_635_920_106_510));

        let wallet = parse_balance(&info, "ACCOUNT_TYPE_WALLET", &index).unwrap();
        assert_eq!(wallet.entries["USDT"].free, Some(dec!(100)));
        assert!(!wallet.entries.contains_key("BTC"));
    }

    #[test]
    fn test_parse_order_message_overrides_status() {
        let index = index();
        let order = parse_order(
            &json!({"message": "order accepted for placing", "status": "SUCCESS", "id": "o1"}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.status, Some(OrderStatus::Open));

        let order = parse_order(
            &json!({"message": "cancellation request successfully submitted", "status": "SUCCESS", "id": "o1"}),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.status, Some(OrderStatus::Canceled));
    }

    #[test]
    fn test_parse_order_placement_response_leaves_gaps() {
        let index = index();
        let market = index.market("BTC/USDT").unwrap().clone();
        let order = parse_order(
            &json!({"message": "order accepted for placing", "status": "SUCCESS",
                    "id": "1345c9b5-6b2c-4d53-8bd9-fcd1f8bb6b44"}),
            Some(&market),
            &index,
        )
        .unwrap();
        assert_eq!(order.id.as_deref(), Some("1345c9b5-6b2c-4d53-8bd9-fcd1f8bb6b44"));
        assert_eq!(order.symbol.as_deref(), Some("BTC/USDT"));
        assert_eq!(order.side, None);
        assert_eq!(order.order_type, None);
        assert_eq!(order.amount, None);
        assert_eq!(order.price, None);

        let order = parse_order(&json!({"message": "ok", "status": "SUCCESS"}), None, &index).unwrap();
        assert_eq!(order.id, None);
        assert_eq!(order.symbol, None);
    }

    #[test]
    fn test_parse_order_fields() {
        let index = index();
        let order = parse_order(
            &json!({
                "id": "o1",
                "status": "ORDER_STATUS_PLACED",
                "side": "ORDER_SIDE_SELL",
                "condition": "ORDER_CONDITION_GOOD_TILL_CANCELLED",
                "type": "ORDER_TYPE_LIMIT",
                "baseCurrency": BTC_ID,
                "quoteCurrency": USDT_ID,
                "clientOrderId": "my-order",
                "price": "100",
                "quantity": "2",
                "cost": "100",
                "filled": "1",
                "timestamp": 1700000000000u64
            }),
            None,
            &index,
        )
        .unwrap();
        assert_eq!(order.symbol.as_deref(), Some("BTC/USDT"));
        assert_eq!(order.side, Some(Side::Sell));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.time_in_force, Some(TimeInForce::Gtc));
        assert_eq!(order.remaining, Some(dec!(1)));
        assert_eq!(order.average, Some(dec!(100)));
        assert_eq!(order.status, Some(OrderStatus::Open));
    }

    #[test]
    fn test_parse_transaction() {
        let index = index();
        let tx = parse_transaction(
            &json!({
                "id": "tx1",
                "status": "TRANSACTION_STATUS_CONFIRMED",
                "type": "TRANSACTION_TYPE_DEPOSIT",
                "senderAddress": "from",
                "recipientAddress": "to",
                "amount": "1.5",
                "transactionFee": "0",
                "timestamp": 1700000000000u64,
                "transactionHash": "0xabc",
                "memo": "42",
                "currency": USDT_ID
            }),
            &index,
        )
        .unwrap();
        assert_eq!(tx.tx_type, Some(TransactionType::Deposit));
        assert_eq!(tx.status, Some(TransactionStatus::Ok));
        assert_eq!(tx.currency.as_deref(), Some("USDT"));
        assert_eq!(tx.address.as_deref(), Some("to"));
        assert_eq!(tx.tag.as_deref(), Some("42"));
        assert_eq!(
            parse_transaction_status("TRANSACTION_STATUS_PENDING"),
            TransactionStatus::Other("TRANSACTION_STATUS_PENDING".into())
        );
    }

    #[test]
    fn test_parse_order_book() {
        let book = parse_order_book(
            &json!({
                "ask": [{"price": "4429.77", "quantity": "1.1"}, {"price": "4428.76", "quantity": "0.08"}],
                "bid": [{"price": "4428.1", "quantity": "0.5"}]
            }),
            "BTC/USDT",
        )
        .unwrap();
        assert_eq!(book.best_ask().unwrap().price, dec!(4428.76));
        assert_eq!(book.best_bid().unwrap().amount, dec!(0.5));
    }
}
