//! WhiteBIT 응답 -> 통합 모델. 시각은 대부분 소수점 있는 초 단위.

use std::collections::BTreeMap;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use interface::{
    de,
    market::parse_precision,
    Balance, Balances, Currency, CurrencyLimits, CurrencyNetwork, DepositAddress, ErrorKind,
    ExchangeError, ExchangeId, Fee, Market, MarketIndex, MarketLimits, MarketPrecision, MinMax,
    Ohlcv, Order, OrderBook, OrderBookEntry, OrderType, Side, TakerOrMaker, Ticker, Trade,
    TradingFee, Transaction, TransactionStatus, TransactionType,
};

use crate::request::decode;

const DELIMITER: &str = "_";

/// 1594391747.532965 -> 1594391747532
pub fn seconds_to_millis(value: &Value) -> Option<i64> {
    de::value_decimal(value).and_then(|secs| (secs * dec!(1000)).trunc().to_i64())
}

fn opt_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(seconds_to_millis))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    name: String,
    stock: String,
    money: String,
    #[serde(default, deserialize_with = "de::opt_i64")]
    stock_prec: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    money_prec: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    maker_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    taker_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_total: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    trades_enabled: Option<bool>,
    #[serde(default, rename = "type")]
    market_type: Option<String>,
}

/// 현물만. 선물(`futures`) 마켓은 None
pub fn parse_market(info: &Value, index: &MarketIndex) -> Result<Option<Market>, ExchangeError> {
    let raw: RawMarket = decode("market", info.clone())?;
    if raw.market_type.as_deref().is_some_and(|t| t != "spot") {
        return Ok(None);
    }
    let base = index.safe_currency_code(&raw.stock);
    let quote = index.safe_currency_code(&raw.money);
    Ok(Some(Market {
        id: raw.name,
        symbol: format!("{}/{}", base, quote),
        base,
        quote,
        base_id: raw.stock,
        quote_id: raw.money,
        active: raw.trades_enabled,
        precision: MarketPrecision {
            amount: raw.stock_prec.and_then(parse_precision),
            price: raw.money_prec.and_then(parse_precision),
        },
        limits: MarketLimits {
            amount: MinMax::new(raw.min_amount, None),
            cost: MinMax::new(raw.min_total, None),
            ..Default::default()
        },
        maker: raw.maker_fee,
        taker: raw.taker_fee,
        info: info.clone(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct RawNetworks {
    #[serde(default)]
    deposits: Vec<String>,
    #[serde(default)]
    withdraws: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(default, deserialize_with = "de::opt_bool")]
    can_deposit: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_bool")]
    can_withdraw: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_withdraw: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    max_withdraw: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    min_deposit: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    max_deposit: Option<Decimal>,
    #[serde(default)]
    networks: Option<RawNetworks>,
}

/// 0 은 한도 없음
fn limit(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

/// assets 응답은 `{ "BTC": {...}, ... }`. 입출금 플래그가 없으면 가능한 것으로 본다.
pub fn parse_currency(id: &str, info: &Value, index: &MarketIndex) -> Result<Currency, ExchangeError> {
    let raw: RawAsset = decode("asset", info.clone())?;
    let deposit = raw.can_deposit.unwrap_or(true);
    let withdraw = raw.can_withdraw.unwrap_or(true);
    let limits = CurrencyLimits {
        withdraw: MinMax::new(raw.min_withdraw, limit(raw.max_withdraw)),
        deposit: MinMax::new(raw.min_deposit, limit(raw.max_deposit)),
        ..Default::default()
    };
    let networks = raw.networks.unwrap_or_default();
    let mut network_ids: Vec<&String> = networks.deposits.iter().chain(&networks.withdraws).collect();
    network_ids.sort();
    network_ids.dedup();
    let networks: BTreeMap<String, CurrencyNetwork> = network_ids
        .into_iter()
        .map(|network| {
            let can_deposit = networks.deposits.contains(network);
            let can_withdraw = networks.withdraws.contains(network);
            let entry = CurrencyNetwork {
                id: network.clone(),
                network: network_code(network),
                active: Some(can_deposit && can_withdraw),
                deposit: Some(can_deposit),
                withdraw: Some(can_withdraw),
                fee: None,
                precision: None,
                limits,
                info: Value::Null,
            };
            (entry.network.clone(), entry)
        })
        .collect();
    Ok(Currency {
        id: id.to_string(),
        code: index.safe_currency_code(id),
        name: None,
        currency_type: None,
        active: Some(deposit && withdraw),
        deposit: Some(deposit),
        withdraw: Some(withdraw),
        fee: None,
        precision: None,
        limits,
        networks,
        info: info.clone(),
    })
}

/// WhiteBIT 네트워크 id -> 통합 네트워크 이름
pub fn network_code(id: &str) -> String {
    match id {
        "BEP20" => "BSC".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(default, deserialize_with = "de::opt_decimal")]
    bid: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    ask: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    open: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    high: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    low: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    last_price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    volume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    base_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    deal: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    quote_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    change: Option<Decimal>,
}

/// v1 ticker 와 v4 tickers 항목을 모두 받는다. change 는 퍼센트.
pub fn parse_ticker(info: &Value, symbol: &str) -> Result<Ticker, ExchangeError> {
    let raw: RawTicker = decode("ticker", info.clone())?;
    let last = raw.last_price.or(raw.last);
    Ok(Ticker {
        symbol: symbol.to_string(),
        timestamp: None,
        high: raw.high,
        low: raw.low,
        bid: raw.bid,
        ask: raw.ask,
        open: raw.open,
        close: last,
        last,
        percentage: raw.change,
        base_volume: raw.base_volume.or(raw.volume),
        quote_volume: raw.quote_volume.or(raw.deal),
        info: info.clone(),
        ..Default::default()
    }
    .complete())
}

#[derive(Debug, Deserialize)]
struct RawOrderBook {
    #[serde(default, deserialize_with = "opt_millis")]
    timestamp: Option<i64>,
    #[serde(default)]
    bids: Vec<Vec<Value>>,
    #[serde(default)]
    asks: Vec<Vec<Value>>,
}

fn levels(raw: &[Vec<Value>]) -> Vec<OrderBookEntry> {
    raw.iter()
        .filter_map(|level| {
            Some(OrderBookEntry::new(
                de::value_decimal(level.first()?)?,
                de::value_decimal(level.get(1)?)?,
            ))
        })
        .collect()
}

pub fn parse_order_book(info: &Value, symbol: &str) -> Result<OrderBook, ExchangeError> {
    let raw: RawOrderBook = decode("order book", info.clone())?;
    Ok(OrderBook::new(
        symbol,
        levels(&raw.bids),
        levels(&raw.asks),
        raw.timestamp,
        info.clone(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, rename = "tradeID", deserialize_with = "de::opt_string")]
    trade_id: Option<String>,
    #[serde(default, deserialize_with = "opt_millis")]
    time: Option<i64>,
    #[serde(default, rename = "trade_timestamp", deserialize_with = "opt_millis")]
    trade_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    deal_order_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    order_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, rename = "quote_volume", deserialize_with = "de::opt_decimal")]
    quote_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    deal: Option<Decimal>,
    #[serde(default, rename = "type")]
    trade_type: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    role: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
}

/// 공개 체결, 주문별 체결, 내 체결 세 모양을 모두 받는다. role 1 = maker, 2 = taker
pub fn parse_trade(info: &Value, market: &Market) -> Result<Trade, ExchangeError> {
    let raw: RawTrade = decode("trade", info.clone())?;
    let side = raw
        .trade_type
        .as_deref()
        .or(raw.side.as_deref())
        .and_then(Side::parse_loose);
    let fee = raw.fee.map(|cost| Fee {
        cost: Some(cost),
        currency: Some(market.quote.clone()),
        rate: None,
    });
    Ok(Trade {
        id: raw.id.or(raw.trade_id),
        order: raw.deal_order_id.or(raw.order_id),
        timestamp: raw.time.or(raw.trade_timestamp),
        symbol: Some(market.symbol.clone()),
        side,
        order_type: None,
        taker_or_maker: raw.role.map(|role| {
            if role == 1 {
                TakerOrMaker::Maker
            } else {
                TakerOrMaker::Taker
            }
        }),
        price: raw.price,
        amount: raw.amount.or(raw.quote_volume),
        cost: raw.deal,
        fee,
        info: info.clone(),
    }
    .complete())
}

/// 내 체결: 마켓을 주면 배열, 안 주면 `{ "BTC_USDT": [...] }`
pub fn parse_my_trades(
    response: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Vec<Trade>, ExchangeError> {
    let mut trades = Vec::new();
    match (response, market) {
        (Value::Array(rows), Some(market)) => {
            for row in rows {
                trades.push(parse_trade(row, market)?);
            }
        }
        (Value::Object(by_market), _) => {
            for (id, rows) in by_market {
                let market = index.safe_market(id, market, Some(DELIMITER));
                for row in rows.as_array().map(Vec::as_slice).unwrap_or_default() {
                    trades.push(parse_trade(row, &market)?);
                }
            }
        }
        _ => {}
    }
    trades.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    Ok(trades)
}

/// [ts(초), open, close, high, low, volume, quote volume]
pub fn parse_ohlcv(row: &Value) -> Option<Ohlcv> {
    let row = row.as_array()?;
    let number = |i: usize| row.get(i).and_then(de::value_decimal);
    Some(Ohlcv {
        timestamp: row.first().and_then(de::value_i64)? * 1000,
        open: number(1)?,
        high: number(3)?,
        low: number(4)?,
        close: number(2)?,
        volume: number(5)?,
    })
}

/// 현물 계정은 available/freeze, 메인 계정은 main_balance
pub fn parse_balance(response: &Value, index: &MarketIndex) -> Balances {
    let mut balances = Balances::new(response.clone());
    let Some(entries) = response.as_object() else {
        return balances;
    };
    for (id, entry) in entries {
        let balance = match entry {
            Value::Object(_) => Balance {
                free: entry.get("available").and_then(de::value_decimal),
                used: entry.get("freeze").and_then(de::value_decimal),
                total: entry.get("main_balance").and_then(de::value_decimal),
            },
            other => Balance {
                total: de::value_decimal(other),
                ..Default::default()
            },
        };
        balances.insert(index.safe_currency_code(id), balance);
    }
    balances
}

pub fn parse_order_type(raw: &str) -> OrderType {
    match raw {
        "limit" | "stop limit" | "margin limit" => OrderType::Limit,
        "market" | "stop market" | "stock market" | "margin market" => OrderType::Market,
        other => OrderType::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrder {
    #[serde(default, deserialize_with = "de::opt_string")]
    order_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    client_order_id: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default, rename = "type")]
    order_type: Option<String>,
    #[serde(default, deserialize_with = "opt_millis")]
    ctime: Option<i64>,
    #[serde(default, deserialize_with = "opt_millis")]
    timestamp: Option<i64>,
    #[serde(default, deserialize_with = "opt_millis")]
    ftime: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    deal_money: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    deal_stock: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    left: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    deal_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    price: Option<Decimal>,
    #[serde(default, rename = "activation_price", deserialize_with = "de::opt_decimal")]
    activation_price: Option<Decimal>,
}

/// 시장가 매수의 amount 는 quote 총액이라 체결 수량으로 바꾼다
pub fn parse_order(
    info: &Value,
    market: Option<&Market>,
    index: &MarketIndex,
) -> Result<Order, ExchangeError> {
    let raw: RawOrder = decode("order", info.clone())?;
    let market = match raw.market.as_deref() {
        Some(id) => index.safe_market(id, market, Some(DELIMITER)),
        None => market.cloned().unwrap_or_default(),
    };
    let side = raw.side.as_deref().and_then(Side::parse_loose);
    let is_market_buy = side == Some(Side::Buy)
        && matches!(raw.order_type.as_deref(), Some("market") | Some("stop market"));
    let amount = if is_market_buy { raw.deal_stock } else { raw.amount };
    let fee = raw.deal_fee.map(|cost| Fee {
        cost: Some(cost),
        currency: (!market.quote.is_empty()).then(|| market.quote.clone()),
        rate: None,
    });
    let symbol = (!market.symbol.is_empty()).then(|| market.symbol.clone());
    Ok(Order {
        id: raw.order_id.or(raw.id),
        client_order_id: raw.client_order_id,
        timestamp: raw.ctime.or(raw.timestamp),
        last_trade_timestamp: raw.ftime,
        symbol,
        side,
        order_type: raw.order_type.as_deref().map(parse_order_type),
        time_in_force: None,
        post_only: None,
        price: raw.price,
        trigger_price: raw.activation_price,
        amount,
        filled: raw.deal_stock,
        remaining: raw.left,
        cost: raw.deal_money,
        average: None,
        status: None,
        fee,
        trades: Vec::new(),
        info: info.clone(),
    }
    .complete())
}

pub fn parse_transaction_status(raw: &str) -> TransactionStatus {
    match raw {
        "3" | "7" => TransactionStatus::Ok,
        "4" | "9" => TransactionStatus::Canceled,
        "1" | "2" | "5" | "6" | "10" | "11" | "12" | "13" | "14" | "15" | "16" | "17" => {
            TransactionStatus::Pending
        }
        other => TransactionStatus::Other(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    unique_id: Option<String>,
    #[serde(default, deserialize_with = "opt_millis")]
    created_at: Option<i64>,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    method: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    memo: Option<String>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    fee: Option<Decimal>,
    #[serde(default, deserialize_with = "de::opt_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    network: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    transaction_hash: Option<String>,
}

/// method 1 = 입금, 2 = 출금
pub fn parse_transaction(
    info: &Value,
    code: Option<&str>,
    index: &MarketIndex,
) -> Result<Transaction, ExchangeError> {
    let raw: RawTransaction = decode("transaction", info.clone())?;
    let currency = raw
        .ticker
        .as_deref()
        .map(|id| index.safe_currency_code(id))
        .or_else(|| code.map(str::to_string));
    let tx_type = match raw.method {
        Some(1) => Some(TransactionType::Deposit),
        Some(2) => Some(TransactionType::Withdrawal),
        _ => None,
    };
    let is_deposit = tx_type == Some(TransactionType::Deposit);
    let is_withdrawal = tx_type == Some(TransactionType::Withdrawal);
    Ok(Transaction {
        id: raw.unique_id,
        txid: raw.transaction_hash,
        timestamp: raw.created_at,
        network: raw.network.as_deref().map(network_code),
        address_from: raw.address.clone().filter(|_| is_deposit),
        address_to: raw.address.clone().filter(|_| is_withdrawal),
        address: raw.address,
        tag: raw.memo,
        tag_from: None,
        tag_to: None,
        tx_type,
        amount: raw.amount,
        fee: Some(Fee {
            cost: raw.fee,
            currency: currency.clone(),
            rate: None,
        }),
        currency,
        status: raw.status.as_deref().map(parse_transaction_status),
        updated: None,
        comment: raw.description,
        info: info.clone(),
    })
}

/// 이력 응답의 `records`
pub fn records(response: &Value) -> Vec<Value> {
    response
        .get("records")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// assets 의 maker_fee/taker_fee 는 퍼센트 단위. 마켓의 base 자산 수수료를 쓴다.
pub fn parse_trading_fees<'a>(
    assets: &Value,
    markets: impl Iterator<Item = &'a Market>,
) -> BTreeMap<String, TradingFee> {
    markets
        .map(|market| {
            let info = assets.get(&market.base_id).cloned().unwrap_or(Value::Null);
            let rate = |key: &str| {
                info.get(key)
                    .and_then(de::value_decimal)
                    .map(|percent| percent / Decimal::ONE_HUNDRED)
            };
            let fee = TradingFee {
                symbol: market.symbol.clone(),
                maker: rate("maker_fee"),
                taker: rate("taker_fee"),
                percentage: Some(true),
                tier_based: Some(false),
                info: info.clone(),
            };
            (market.symbol.clone(), fee)
        })
        .collect()
}

/// 암호화폐는 account.address/memo, 법정화폐는 url
pub fn parse_deposit_address(response: &Value, code: &str) -> Result<DepositAddress, ExchangeError> {
    let account = response.get("account");
    let address = account
        .and_then(|a| a.get("address"))
        .and_then(de::value_string)
        .or_else(|| response.get("url").and_then(de::value_string))
        .ok_or_else(|| {
            ExchangeError::new(
                ErrorKind::InvalidAddress,
                ExchangeId::Whitebit,
                "fetch_deposit_address",
                format!("{} address is missing: {}", ExchangeId::Whitebit, response),
            )
        })?;
    Ok(DepositAddress {
        currency: code.to_string(),
        address,
        tag: account.and_then(|a| a.get("memo")).and_then(de::value_string),
        network: None,
        info: response.clone(),
    })
}
