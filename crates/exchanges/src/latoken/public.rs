use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use interface::{
    de::value_i64, model::filter_by_since_limit, time::milliseconds, Access, Currency,
    Description, ExchangeError, ExchangeId, Market, MarketIndex, OrderBook, Page, Ticker, Trade,
    TradingFee,
};

use super::{parse, LatokenClient, TradingFeeSource, DESCRIPTION};
use crate::{
    request::{decode, insert_opt, params},
    Exchange, PublicExchange,
};

impl LatokenClient {
    /// 서버 시각과 로컬 시각의 차이를 저장한다. 이후 nonce 와 주문 timestamp 에 반영된다.
    pub async fn load_time_difference(&self) -> Result<i64, ExchangeError> {
        let server_time = self.fetch_time().await?;
        let difference = milliseconds() - server_time;
        self.set_time_difference(difference);
        debug!(difference, "latoken time difference");
        Ok(difference)
    }

    /// 옵션에 따라 공개 또는 계정별 수수료를 조회한다
    pub async fn fetch_trading_fee(&self, symbol: &str) -> Result<TradingFee, ExchangeError> {
        let (api, path) = match self.options.trading_fee_source {
            TradingFeeSource::Public => (Access::Public, "trade/fee/{currency}/{quote}"),
            TradingFeeSource::Private => {
                self.config
                    .credentials(ExchangeId::Latoken, "fetch_trading_fee")?;
                (Access::Private, "auth/trade/fee/{currency}/{quote}")
            }
        };
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_trading_fee",
                api,
                Method::GET,
                path,
                params(json!({ "currency": market.base_id, "quote": market.quote_id })),
            )
            .await?;
        parse::parse_trading_fee(&response, &market)
    }
}

#[async_trait]
impl Exchange for LatokenClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Latoken
    }

    fn describe(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn index(&self) -> &RwLock<MarketIndex> {
        &self.index
    }
}

#[async_trait]
impl PublicExchange for LatokenClient {
    async fn fetch_currencies(&self) -> Result<BTreeMap<String, Currency>, ExchangeError> {
        let response = self
            .request("fetch_currencies", Access::Public, Method::GET, "currency", Default::default())
            .await?;
        let rows: Vec<Value> = decode("currencies", response)?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for row in &rows {
            let currency = parse::parse_currency(row, &index)?;
            out.insert(currency.code.clone(), currency);
        }
        Ok(out)
    }

    /// pair 는 통화 UUID 만 주므로 통화 목록이 먼저 있어야 한다
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        if self.index.read().await.currencies().is_empty() {
            let currencies = self.fetch_currencies().await?;
            self.index
                .write()
                .await
                .set_currencies(currencies.into_values());
        }
        let response = self
            .request("fetch_markets", Access::Public, Method::GET, "pair", Default::default())
            .await?;
        if self.options.adjust_for_time_difference {
            self.load_time_difference().await?;
        }
        let rows: Vec<Value> = decode("pairs", response)?;
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
                Access::Public,
                Method::GET,
                "ticker/{base}/{quote}",
                params(json!({ "base": market.base_id, "quote": market.quote_id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_ticker(&response, Some(&market), &index)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request("fetch_tickers", Access::Public, Method::GET, "ticker", Default::default())
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
        let mut request = params(json!({ "currency": market.base_id, "quote": market.quote_id }));
        // 최대 1000
        insert_opt(&mut request, "limit", limit);
        let response = self
            .request(
                "fetch_order_book",
                Access::Public,
                Method::GET,
                "book/{currency}/{quote}",
                request,
            )
            .await?;
        parse::parse_order_book(&response, &market.symbol)
    }

    async fn fetch_trades(&self, symbol: &str, page: Page) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.market(symbol).await?;
        let mut request = params(json!({ "currency": market.base_id, "quote": market.quote_id }));
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request(
                "fetch_trades",
                Access::Public,
                Method::GET,
                "trade/history/{currency}/{quote}",
                request,
            )
            .await?;
        let rows: Vec<Value> = decode("trades", response)?;
        let index = self.index.read().await;
        let trades = rows
            .iter()
            .map(|row| parse::parse_trade(row, Some(&market), &index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        let response = self
            .request("fetch_time", Access::Public, Method::GET, "time", Default::default())
            .await?;
        response
            .get("serverTime")
            .and_then(value_i64)
            .ok_or_else(|| ExchangeError::Other(format!("Latoken time without serverTime: {}", response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::LatokenOptions;
    use interface::{ErrorKind, Timeframe};

    #[tokio::test]
    async fn test_ohlcv_not_supported() {
        let client = LatokenClient::new();
        let err = client
            .fetch_ohlcv("BTC/USDT", Timeframe::H1, Page::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotSupported));
    }

    #[tokio::test]
    async fn test_private_fee_source_requires_credentials() {
        let client = LatokenClient::new();
        let err = client.fetch_trading_fee("BTC/USDT").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }

    #[tokio::test]
    async fn test_fetch_markets_latoken() {
        let client = LatokenClient::new().with_options(LatokenOptions {
            adjust_for_time_difference: false,
            ..Default::default()
        });
        match client.load_markets(false).await {
            Ok(markets) => {
                for market in &markets {
                    assert_eq!(market.symbol, format!("{}/{}", market.base, market.quote));
                }
            }
            Err(e) => {
                eprintln!("Warning: load_markets failed: {:?}", e);
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_time_latoken() {
        let client = LatokenClient::new();
        match client.load_time_difference().await {
            Ok(difference) => assert_eq!(client.time_difference(), difference),
            Err(e) => {
                eprintln!("Warning: fetch_time failed: {:?}", e);
            }
        }
    }
}
