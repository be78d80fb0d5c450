use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use interface::{
    de::value_i64, model::filter_by_since_limit, Currency, Description, ExchangeError, ExchangeId,
    Market, MarketIndex, Ohlcv, OrderBook, Page, Params, Ticker, Timeframe, Trade, TradingFee,
};

use super::{parse, WhitebitApi, WhitebitClient, DESCRIPTION};
use crate::{
    request::{decode, insert_opt, params},
    Exchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::Whitebit;
const MAX_OHLCV_LIMIT: usize = 1440;

/// v1 kline 쿼리. since 가 있으면 start/end(초) 구간을 함께 보낸다.
pub(crate) fn kline_request(market_id: &str, interval: &str, timeframe: Timeframe, page: Page) -> Params {
    let mut request = params(json!({ "market": market_id, "interval": interval }));
    let limit = page.limit.map(|l| l.min(MAX_OHLCV_LIMIT));
    if let Some(since) = page.since {
        let limit = limit.unwrap_or(MAX_OHLCV_LIMIT);
        let start = since / 1000;
        request.insert("start".into(), json!(start));
        request.insert("end".into(), json!(start + timeframe.seconds() * limit as i64));
        request.insert("limit".into(), json!(limit));
    } else {
        insert_opt(&mut request, "limit", limit);
    }
    request
}

/// v1 응답의 `result`
fn result(response: Value) -> Value {
    match response {
        Value::Object(mut body) => body.remove("result").unwrap_or(Value::Null),
        other => other,
    }
}

impl WhitebitClient {
    /// `ping` 이 pong 이면 "ok", 아니면 받은 값 그대로
    pub async fn fetch_status(&self) -> Result<String, ExchangeError> {
        let response = self
            .request("fetch_status", WhitebitApi::V4Public, Method::GET, "ping", Params::new())
            .await?;
        let status = response
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(if status == "pong" { "ok".to_string() } else { status })
    }

    /// assets 의 자산별 수수료를 각 마켓의 base 기준으로 붙인다
    pub async fn fetch_trading_fees(&self) -> Result<BTreeMap<String, TradingFee>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request("fetch_trading_fees", WhitebitApi::V4Public, Method::GET, "assets", Params::new())
            .await?;
        let index = self.index.read().await;
        Ok(parse::parse_trading_fees(&response, index.markets()))
    }
}

#[async_trait]
impl Exchange for WhitebitClient {
    fn id(&self) -> ExchangeId {
        ID
    }

    fn describe(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn index(&self) -> &RwLock<MarketIndex> {
        &self.index
    }
}

#[async_trait]
impl PublicExchange for WhitebitClient {
    async fn fetch_currencies(&self) -> Result<BTreeMap<String, Currency>, ExchangeError> {
        let response = self
            .request("fetch_currencies", WhitebitApi::V4Public, Method::GET, "assets", Params::new())
            .await?;
        let assets: serde_json::Map<String, Value> = decode("assets", response)?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for (id, info) in &assets {
            let currency = parse::parse_currency(id, info, &index)?;
            out.insert(currency.code.clone(), currency);
        }
        Ok(out)
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let response = self
            .request("fetch_markets", WhitebitApi::V4Public, Method::GET, "markets", Params::new())
            .await?;
        let rows: Vec<Value> = decode("markets", response)?;
        let index = self.index.read().await;
        let mut markets = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(market) = parse::parse_market(row, &index)? {
                markets.push(market);
            }
        }
        Ok(markets)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_ticker",
                WhitebitApi::V1Public,
                Method::GET,
                "ticker",
                params(json!({ "market": market.id })),
            )
            .await?;
        parse::parse_ticker(&result(response), &market.symbol)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request("fetch_tickers", WhitebitApi::V4Public, Method::GET, "ticker", Params::new())
            .await?;
        let rows: serde_json::Map<String, Value> = decode("tickers", response)?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for (id, row) in &rows {
            let symbol = index.safe_symbol(id, None, Some("_"));
            if symbols.map_or(true, |s| s.contains(&symbol)) {
                out.insert(symbol.clone(), parse::parse_ticker(row, &symbol)?);
            }
        }
        Ok(out)
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<OrderBook, ExchangeError> {
        let market = self.market(symbol).await?;
        let mut request = params(json!({ "market": market.id }));
        insert_opt(&mut request, "limit", limit);
        let response = self
            .request(
                "fetch_order_book",
                WhitebitApi::V4Public,
                Method::GET,
                "orderbook/{market}",
                request,
            )
            .await?;
        parse::parse_order_book(&response, &market.symbol)
    }

    async fn fetch_trades(&self, symbol: &str, page: Page) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_trades",
                WhitebitApi::V4Public,
                Method::GET,
                "trades/{market}",
                params(json!({ "market": market.id })),
            )
            .await?;
        let rows: Vec<Value> = decode("trades", response)?;
        let mut trades = rows
            .iter()
            .map(|row| parse::parse_trade(row, &market))
            .collect::<Result<Vec<_>, _>>()?;
        trades.sort_by_key(|t| t.timestamp);
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        page: Page,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let interval = DESCRIPTION.timeframe(timeframe).ok_or_else(|| {
            ExchangeError::bad_request(ID, "fetch_ohlcv", format!("unsupported timeframe {}", timeframe))
        })?;
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_ohlcv",
                WhitebitApi::V1Public,
                Method::GET,
                "kline",
                kline_request(&market.id, interval, timeframe, page),
            )
            .await?;
        let rows: Vec<Value> = decode("kline", result(response))?;
        let mut candles: Vec<Ohlcv> = rows.iter().filter_map(parse::parse_ohlcv).collect();
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        let response = self
            .request("fetch_time", WhitebitApi::V4Public, Method::GET, "time", Params::new())
            .await?;
        response.get("time").and_then(value_i64).ok_or_else(|| {
            ExchangeError::Other(format!("{} time is missing: {}", ID, response))
        })
    }
}
