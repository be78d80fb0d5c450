use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use interface::{
    model::filter_by_since_limit, Access, Balances, CreateOrderRequest, ExchangeError,
    ExchangeId, Market, Order, OrderType, Page, Params, TimeInForce, Trade,
    Transaction, TransactionType,
};

use super::{parse, LatokenClient};
use crate::{
    request::{decimal_value, decode, insert_opt, params, RestAdapter},
    PrivateExchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::Latoken;

fn condition(tif: Option<&TimeInForce>) -> &'static str {
    match tif {
        Some(TimeInForce::Ioc) => "IOC",
        Some(TimeInForce::Fok) => "FOK",
        _ => "GTC",
    }
}

/// auth/order/place 본문. timestamp 는 초 단위
fn create_order_body(
    request: &CreateOrderRequest,
    market: &Market,
    client_order_id: String,
    timestamp: i64,
) -> Result<Params, ExchangeError> {
    let order_type = match &request.order_type {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
        other => {
            return Err(ExchangeError::invalid_order(
                ID,
                "create_order",
                format!("{} does not support {} orders", ID, other),
            ))
        }
    };
    let mut body = params(json!({
        "baseCurrency": market.base_id,
        "quoteCurrency": market.quote_id,
        "side": request.side.as_str().to_uppercase(),
        "condition": condition(request.time_in_force.as_ref()),
        "type": order_type,
        "clientOrderId": client_order_id,
        "quantity": decimal_value(request.amount),
        "timestamp": timestamp,
    }));
    if request.order_type == OrderType::Limit {
        let price = request
            .price
            .ok_or_else(|| ExchangeError::arguments_required(ID, "create_order", "a price"))?;
        body.insert("price".into(), decimal_value(price));
    }
    Ok(body)
}

fn pair_params(market: &Market) -> Params {
    params(json!({ "currency": market.base_id, "quote": market.quote_id }))
}

impl LatokenClient {
    /// 서버 시각 기준 초
    fn nonce_seconds(&self) -> i64 {
        RestAdapter::nonce(self) / 1000
    }

    async fn market_opt(&self, symbol: Option<&str>) -> Result<Option<Market>, ExchangeError> {
        match symbol {
            Some(symbol) => Ok(Some(self.market(symbol).await?)),
            None => {
                self.load_markets(false).await?;
                Ok(None)
            }
        }
    }

    async fn parse_orders(&self, response: Value, market: Option<&Market>) -> Result<Vec<Order>, ExchangeError> {
        let rows: Vec<Value> = decode("orders", response)?;
        let index = self.index.read().await;
        rows.iter()
            .map(|row| parse::parse_order(row, market, &index))
            .collect()
    }

    /// 입금과 출금이 한 목록으로 온다 (`content` 페이지)
    pub async fn fetch_transactions(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions_as("fetch_transactions", code, page).await
    }

    async fn fetch_transactions_as(
        &self,
        method_name: &'static str,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        self.load_markets(false).await?;
        let response = self
            .request(method_name, Access::Private, Method::GET, "auth/transaction", Params::new())
            .await?;
        let rows: Vec<Value> = match response.get("content") {
            Some(content) => decode("transactions", content.clone())?,
            None => Vec::new(),
        };
        let transactions = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_transaction(row, &index))
                .collect::<Result<Vec<_>, _>>()?
        };
        let transactions = match code {
            Some(code) => transactions
                .into_iter()
                .filter(|tx| tx.currency.as_deref() == Some(code))
                .collect(),
            None => transactions,
        };
        Ok(filter_by_since_limit(transactions, page.since, page.limit))
    }

    async fn fetch_transactions_of(
        &self,
        method_name: &'static str,
        tx_type: TransactionType,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let transactions = self
            .fetch_transactions_as(method_name, code, Page { limit: None, ..page })
            .await?;
        let filtered = transactions
            .into_iter()
            .filter(|tx| tx.tx_type == Some(tx_type))
            .collect();
        Ok(filter_by_since_limit(filtered, page.since, page.limit))
    }
}

#[async_trait]
impl PrivateExchange for LatokenClient {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.config.credentials(ID, "fetch_balance")?;
        self.load_markets(false).await?;
        let response = self
            .request("fetch_balance", Access::Private, Method::GET, "auth/account", Params::new())
            .await?;
        let index = self.index.read().await;
        parse::parse_balance(&response, self.options.account_type.as_str(), &index)
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "create_order")?;
        request.validate(ID, "create_order")?;
        let market = self.market(&request.symbol).await?;
        let client_order_id = request
            .client_order_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let body = create_order_body(request, &market, client_order_id, self.nonce_seconds())?;
        let response = self
            .request("create_order", Access::Private, Method::POST, "auth/order/place", body)
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn cancel_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        self.load_markets(false).await?;
        let response = self
            .request(
                "cancel_order",
                Access::Private,
                Method::POST,
                "auth/order/cancel",
                params(json!({ "id": id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, None, &index)
    }

    /// 응답은 결과 메시지 하나뿐이라 목록에 한 건만 담긴다
    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "cancel_all_orders")?;
        let market = self.market_opt(symbol).await?;
        let (path, request) = match &market {
            Some(market) => ("auth/order/cancelAll/{currency}/{quote}", pair_params(market)),
            None => ("auth/order/cancelAll", Params::new()),
        };
        let response = self
            .request("cancel_all_orders", Access::Private, Method::POST, path, request)
            .await?;
        let index = self.index.read().await;
        Ok(vec![parse::parse_order(&response, market.as_ref(), &index)?])
    }

    async fn fetch_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "fetch_order")?;
        self.load_markets(false).await?;
        let response = self
            .request(
                "fetch_order",
                Access::Private,
                Method::GET,
                "auth/order/getOrder/{id}",
                params(json!({ "id": id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, None, &index)
    }

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "fetch_orders")?;
        let market = self.market_opt(symbol).await?;
        let (path, mut request) = match &market {
            Some(market) => ("auth/order/pair/{currency}/{quote}", pair_params(market)),
            None => ("auth/order", Params::new()),
        };
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request("fetch_orders", Access::Private, Method::GET, path, request)
            .await?;
        let orders = self.parse_orders(response, market.as_ref()).await?;
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    async fn fetch_open_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "fetch_open_orders")?;
        let symbol = symbol
            .ok_or_else(|| ExchangeError::arguments_required(ID, "fetch_open_orders", "a symbol"))?;
        let market = self.market(symbol).await?;
        let response = self
            .request(
                "fetch_open_orders",
                Access::Private,
                Method::GET,
                "auth/order/pair/{currency}/{quote}/active",
                pair_params(&market),
            )
            .await?;
        let orders = self.parse_orders(response, Some(&market)).await?;
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_my_trades")?;
        let market = self.market_opt(symbol).await?;
        let (path, mut request) = match &market {
            Some(market) => ("auth/trade/pair/{currency}/{quote}", pair_params(market)),
            None => ("auth/trade", Params::new()),
        };
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request("fetch_my_trades", Access::Private, Method::GET, path, request)
            .await?;
        let rows: Vec<Value> = decode("trades", response)?;
        let trades = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_trade(row, market.as_ref(), &index))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_deposits(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions_of("fetch_deposits", TransactionType::Deposit, code, page)
            .await
    }

    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions_of("fetch_withdrawals", TransactionType::Withdrawal, code, page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{ErrorKind, Side, WithdrawRequest};
    use rust_decimal_macros::dec;

    fn market() -> Market {
        let mut market = Market::stub("pair-1", "BTC", "USDT");
        market.base_id = "btc-uuid".into();
        market.quote_id = "usdt-uuid".into();
        market
    }

    #[test]
    fn test_limit_order_body() {
        let request = CreateOrderRequest::limit("BTC/USDT", Side::Buy, dec!(0.5), dec!(30000));
        let body = create_order_body(&request, &market(), "cid".into(), 1_700_000_000).unwrap();
        assert_eq!(
            Value::Object(body),
            json!({
                "baseCurrency": "btc-uuid",
                "quoteCurrency": "usdt-uuid",
                "side": "BUY",
                "condition": "GTC",
                "type": "LIMIT",
                "clientOrderId": "cid",
                "price": "30000",
                "quantity": "0.5",
                "timestamp": 1_700_000_000
            })
        );
    }

    #[test]
    fn test_market_order_body_has_no_price() {
        let request = CreateOrderRequest::market("BTC/USDT", Side::Sell, dec!(1))
            .with_time_in_force(TimeInForce::Ioc);
        let body = create_order_body(&request, &market(), "cid".into(), 1).unwrap();
        assert!(body.get("price").is_none());
        assert_eq!(body["condition"], json!("IOC"));
        assert_eq!(body["type"], json!("MARKET"));
    }

    #[test]
    fn test_unsupported_order_type() {
        let request = CreateOrderRequest::new(
            "BTC/USDT",
            OrderType::Other("stop".into()),
            Side::Buy,
            dec!(1),
        );
        let err = create_order_body(&request, &market(), "cid".into(), 1).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOrder));
    }

    #[tokio::test]
    async fn test_credentials_checked_first() {
        let client = LatokenClient::new();
        let err = client.fetch_open_orders(None, Page::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
        let err = client.fetch_transactions(None, Page::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }

    #[tokio::test]
    async fn test_open_orders_require_symbol() {
        let client = LatokenClient::with_config(
            interface::ExchangeConfig::new()
                .with_api_key("key")
                .with_secret("secret"),
        )
        .unwrap();
        let err = client.fetch_open_orders(None, Page::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ArgumentsRequired));
    }

    #[tokio::test]
    async fn test_not_supported_private_surface() {
        let client = LatokenClient::new();
        assert_eq!(
            client
                .fetch_closed_orders(None, Page::new())
                .await
                .unwrap_err()
                .kind(),
            Some(ErrorKind::NotSupported)
        );
        let request = WithdrawRequest::new("BTC", dec!(1), "addr");
        assert_eq!(
            client.withdraw(&request).await.unwrap_err().kind(),
            Some(ErrorKind::NotSupported)
        );
    }
}
