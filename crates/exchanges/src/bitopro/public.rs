use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tokio::sync::RwLock;

use interface::{
    model::filter_by_since_limit, time::seconds, Access, Currency, Description, ExchangeError,
    ExchangeId, Market, MarketIndex, Ohlcv, OrderBook, Page, Ticker, Timeframe, Trade, TradingFee,
};

use super::{parse, BitoproClient, DESCRIPTION};
use crate::{
    request::{insert_opt, params},
    Exchange, PublicExchange,
};

const DEFAULT_OHLCV_LIMIT: i64 = 500;

/// 캔들 조회 구간(초)과 빈 캔들 채우기 기준 시각(ms).
/// since 가 없으면 지금부터 limit 개 이전까지.
pub(crate) fn ohlcv_window(
    timeframe: Timeframe,
    since: Option<i64>,
    limit: i64,
    now_secs: i64,
) -> (i64, i64, Option<i64>) {
    let span = limit * timeframe.seconds();
    match since {
        None => (now_secs - span, now_secs, None),
        Some(since) => {
            let from = since / 1000;
            let distance = timeframe.millis();
            let aligned = since.div_euclid(distance) * distance;
            (from, from + span, Some(aligned))
        }
    }
}

impl BitoproClient {
    /// 기본 등급 수수료. 계정별 등급은 조회하지 않는다.
    pub async fn fetch_trading_fees(&self) -> Result<BTreeMap<String, TradingFee>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request(
                "fetch_trading_fees",
                Access::Public,
                Method::GET,
                "provisioning/limitations-and-fees",
                Default::default(),
            )
            .await?;
        let symbols = self.index.read().await.symbols();
        parse::parse_trading_fees(&response, symbols)
    }
}

#[async_trait]
impl Exchange for BitoproClient {
    fn id(&self) -> ExchangeId {
        ExchangeId::Bitopro
    }

    fn describe(&self) -> &'static Description {
        &DESCRIPTION
    }

    fn index(&self) -> &RwLock<MarketIndex> {
        &self.index
    }
}

#[async_trait]
impl PublicExchange for BitoproClient {
    async fn fetch_currencies(&self) -> Result<BTreeMap<String, Currency>, ExchangeError> {
        let response = self
            .request(
                "fetch_currencies",
                Access::Public,
                Method::GET,
                "provisioning/currencies",
                Default::default(),
            )
            .await?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for row in &parse::data_rows(&response)? {
            let currency = parse::parse_currency(row, &index)?;
            out.insert(currency.code.clone(), currency);
        }
        Ok(out)
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let response = self
            .request(
                "fetch_markets",
                Access::Public,
                Method::GET,
                "provisioning/trading-pairs",
                Default::default(),
            )
            .await?;
        let index = self.index.read().await;
        parse::data_rows(&response)?
            .iter()
            .map(|row| parse::parse_market(row, &index))
            .collect()
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_ticker",
                Access::Public,
                Method::GET,
                "tickers/{pair}",
                params(json!({ "pair": market.id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_ticker(&parse::data(&response), Some(&market), &index)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.load_markets(false).await?;
        let response = self
            .request("fetch_tickers", Access::Public, Method::GET, "tickers", Default::default())
            .await?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for row in &parse::data_rows(&response)? {
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
        let mut request = params(json!({ "pair": market.id }));
        insert_opt(&mut request, "limit", limit);
        let response = self
            .request(
                "fetch_order_book",
                Access::Public,
                Method::GET,
                "order-book/{pair}",
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
                Access::Public,
                Method::GET,
                "trades/{pair}",
                params(json!({ "pair": market.id })),
            )
            .await?;
        let index = self.index.read().await;
        let trades = parse::data_rows(&response)?
            .iter()
            .map(|row| parse::parse_trade(row, Some(&market), &index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    /// 거래가 없던 구간은 직전 종가로 채운다
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        page: Page,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let resolution = DESCRIPTION.timeframe(timeframe).ok_or_else(|| {
            ExchangeError::bad_request(
                ExchangeId::Bitopro,
                "fetch_ohlcv",
                format!("unsupported timeframe {}", timeframe),
            )
        })?;
        let market = self.market(symbol).await?;
        let limit = page.limit.map_or(DEFAULT_OHLCV_LIMIT, |l| l as i64);
        let (from, to, aligned) = ohlcv_window(timeframe, page.since, limit, seconds());
        let response = self
            .request(
                "fetch_ohlcv",
                Access::Public,
                Method::GET,
                "trading-history/{pair}",
                params(json!({
                    "pair": market.id,
                    "resolution": resolution,
                    "from": from,
                    "to": to,
                })),
            )
            .await?;
        let mut candles = Vec::new();
        for row in &parse::data_rows(&response)? {
            if let Some(candle) = parse::parse_ohlcv(row)? {
                candles.push(candle);
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(parse::fill_missing_candles(
            candles,
            timeframe.millis(),
            aligned,
            limit as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::ErrorKind;

    #[test]
    fn test_ohlcv_window() {
        let (from, to, aligned) = ohlcv_window(Timeframe::H1, None, 10, 100_000);
        assert_eq!((from, to, aligned), (100_000 - 36_000, 100_000, None));

        let since = 3_600_000 * 5 + 1_234;
        let (from, to, aligned) = ohlcv_window(Timeframe::H1, Some(since), 2, 0);
        assert_eq!(from, since / 1000);
        assert_eq!(to, from + 7_200);
        assert_eq!(aligned, Some(3_600_000 * 5));
    }

    #[tokio::test]
    async fn test_unsupported_timeframe() {
        let client = BitoproClient::new();
        let err = client
            .fetch_ohlcv("BTC/TWD", Timeframe::M3, Page::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
        assert_eq!(
            client.fetch_time().await.unwrap_err().kind(),
            Some(ErrorKind::NotSupported)
        );
    }

    #[tokio::test]
    async fn test_fetch_ohlcv_bitopro() {
        let client = BitoproClient::new();
        match client
            .fetch_ohlcv("BTC/TWD", Timeframe::H1, Page::new().limit(24))
            .await
        {
            Ok(candles) => {
                assert!(candles.len() <= 24);
                for pair in candles.windows(2) {
                    assert_eq!(pair[1].timestamp - pair[0].timestamp, 3_600_000);
                }
            }
            Err(e) => {
                eprintln!("Warning: fetch_ohlcv failed: {:?}", e);
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_trading_fees_bitopro() {
        let client = BitoproClient::new();
        match client.fetch_trading_fees().await {
            Ok(fees) => {
                for (symbol, fee) in &fees {
                    assert_eq!(symbol, &fee.symbol);
                }
            }
            Err(e) => {
                eprintln!("Warning: fetch_trading_fees failed: {:?}", e);
            }
        }
    }
}
