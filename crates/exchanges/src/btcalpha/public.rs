use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use interface::{
    model::filter_by_since_limit, Access, Description, ExchangeError, ExchangeId, Market,
    MarketIndex, Ohlcv, OrderBook, Page, Ticker, Timeframe, Trade,
};

use super::{parse, BtcAlphaClient, CHART_PATH, DESCRIPTION};
use crate::{
    request::{decode, insert_opt, params},
    Exchange, PublicExchange,
};

#[async_trait]
impl Exchange for BtcAlphaClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::BtcAlpha
    }

    fn describe(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn index(&self) -> &RwLock<MarketIndex> {
        &self.index
    }
}

#[async_trait]
impl PublicExchange for BtcAlphaClient {
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let response = self
            .request("fetch_markets", Access::Public, Method::GET, "pairs/", Default::default())
            .await?;
        let rows: Vec<Value> = decode("pairs", response)?;
        let index = self.index.read().await;
        rows.iter().map(|row| parse::parse_market(row, &index)).collect()
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_ticker",
                Access::Public,
                Method::GET,
                "ticker/",
                params(json!({ "pair": market.id })),
            )
            .await?;
        // 단일 pair 도 배열로 오는 경우가 있다
        let row = match response {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            other => other,
        };
        let index = self.index.read().await;
        parse::parse_ticker(&row, Some(&market), &index)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request("fetch_tickers", Access::Public, Method::GET, "ticker/", Default::default())
            .await?;
        let rows: Vec<Value> = decode("tickers", response)?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for row in &rows {
            let ticker = parse::parse_ticker(row, None, &index)?;
            if symbols.map_or(true, |s| s.contains(&ticker.symbol)) {
                out.insert(ticker.symbol.clone(), ticker);
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
        let mut request = params(json!({ "pair_name": market.id }));
        if let Some(limit) = limit.filter(|l| *l > 0) {
            request.insert("limit_sell".into(), limit.into());
            request.insert("limit_buy".into(), limit.into());
        }
        let response = self
            .request(
                "fetch_order_book",
                Access::Public,
                Method::GET,
                "orderbook/{pair_name}",
                request,
            )
            .await?;
        parse::parse_order_book(&response, &market.symbol)
    }

    async fn fetch_trades(&self, symbol: &str, page: Page) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.market(symbol).await?;
        let mut request = params(json!({ "pair": market.id }));
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request("fetch_trades", Access::Public, Method::GET, "exchanges/", request)
            .await?;
        let rows: Vec<Value> = decode("trades", response)?;
        let index = self.index.read().await;
        let trades = rows
            .iter()
            .map(|row| parse::parse_trade(row, Some(&market), &index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        page: Page,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let interval = DESCRIPTION.timeframe(timeframe).ok_or_else(|| {
            ExchangeError::bad_request(
                ExchangeId::BtcAlpha,
                "fetch_ohlcv",
                format!("unsupported timeframe {}", timeframe),
            )
        })?;
        let market = self.market(symbol).await?;
        let mut request = params(json!({ "pair": market.id, "type": interval }));
        insert_opt(&mut request, "limit", page.limit);
        insert_opt(&mut request, "since", page.since.map(|since| since / 1000));
        let response = self
            .request("fetch_ohlcv", Access::Public, Method::GET, CHART_PATH, request)
            .await?;
        let rows: Vec<Value> = decode("candles", response)?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(candle) = parse::parse_ohlcv(row)? {
                candles.push(candle);
            }
        }
        Ok(filter_by_since_limit(candles, page.since, page.limit))
    }
}
