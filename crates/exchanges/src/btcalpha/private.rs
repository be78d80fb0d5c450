use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use interface::{
    de::{value_bool, value_string},
    model::filter_by_since_limit,
    Access, Balances, CreateOrderRequest, ExchangeError, ExchangeId, Market, Order, OrderType,
    Page, Params, Trade, Transaction, TransactionType,
};

use super::{parse, BtcAlphaClient};
use crate::{
    request::{decimal_value, decode, insert_opt, params},
    PrivateExchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::BtcAlpha;

/// 지정가만 지원한다
fn create_order_body(request: &CreateOrderRequest, market: &Market) -> Result<Params, ExchangeError> {
    if request.order_type != OrderType::Limit {
        return Err(ExchangeError::invalid_order(
            ID,
            "create_order",
            format!("{} only supports limit orders, got {}", ID, request.order_type),
        ));
    }
    let price = request
        .price
        .ok_or_else(|| ExchangeError::arguments_required(ID, "create_order", "a price"))?;
    Ok(params(json!({
        "pair": market.id,
        "type": request.side.as_str(),
        "amount": decimal_value(request.amount),
        "price": decimal_value(price),
    })))
}

impl BtcAlphaClient {
    async fn market_opt(&self, symbol: Option<&str>) -> Result<Option<Market>, ExchangeError> {
        match symbol {
            Some(symbol) => Ok(Some(self.market(symbol).await?)),
            None => {
                self.load_markets(false).await?;
                Ok(None)
            }
        }
    }

    /// orders/own/. status 1 = open, 3 = closed
    async fn fetch_orders_with_status(
        &self,
        method_name: &'static str,
        status: Option<&str>,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        let market = self.market_opt(symbol).await?;
        let mut request = Params::new();
        insert_opt(&mut request, "pair", market.as_ref().map(|m| m.id.clone()));
        insert_opt(&mut request, "limit", page.limit);
        insert_opt(&mut request, "status", status);
        let response = self
            .request(method_name, Access::Private, Method::GET, "orders/own/", request)
            .await?;
        let rows: Vec<Value> = decode("orders", response)?;
        let orders = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_order(row, market.as_ref(), &index))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    async fn fetch_transactions(
        &self,
        method_name: &'static str,
        path: &str,
        tx_type: TransactionType,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        self.load_markets(false).await?;
        let mut request = Params::new();
        // deposits/ 는 통화 필터를 받지 않아서 응답을 거른다
        if let (Some(code), TransactionType::Withdrawal) = (code, tx_type) {
            let currency_id = self.index.read().await.currency_id(code);
            request.insert("currency_id".into(), currency_id.into());
        }
        let response = self
            .request(method_name, Access::Private, Method::GET, path, request)
            .await?;
        let rows: Vec<Value> = decode("transactions", response)?;
        let transactions = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_transaction(row, tx_type, &index))
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
}

/// 취소 응답은 `{"order": id}` 뿐이다
fn canceled_order(response: Value) -> Order {
    Order {
        id: response.get("order").and_then(value_string),
        info: response,
        ..Default::default()
    }
}

#[async_trait]
impl PrivateExchange for BtcAlphaClient {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.config.credentials(ID, "fetch_balance")?;
        self.load_markets(false).await?;
        let response = self
            .request("fetch_balance", Access::Private, Method::GET, "wallets/", Params::new())
            .await?;
        let index = self.index.read().await;
        parse::parse_balance(&response, &index)
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "create_order")?;
        request.validate(ID, "create_order")?;
        let market = self.market(&request.symbol).await?;
        let body = create_order_body(request, &market)?;
        let response = self
            .request("create_order", Access::Private, Method::POST, "order/", body)
            .await?;
        let success = response.get("success").and_then(value_bool).unwrap_or(false);
        if !success {
            return Err(ExchangeError::invalid_order(
                ID,
                "create_order",
                format!("{} {}", ID, response),
            ));
        }
        let index = self.index.read().await;
        let mut order = parse::parse_order(&response, Some(&market), &index)?;
        // 응답 amount 가 0 이면 요청 수량을 쓴다
        if !order.amount.map_or(false, |a| a.is_sign_positive() && !a.is_zero()) {
            order.amount = Some(request.amount);
        }
        Ok(order)
    }

    async fn cancel_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        let response = self
            .request(
                "cancel_order",
                Access::Private,
                Method::POST,
                "order-cancel/",
                params(json!({ "order": id })),
            )
            .await?;
        Ok(canceled_order(response))
    }

    async fn fetch_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "fetch_order")?;
        self.load_markets(false).await?;
        let response = self
            .request(
                "fetch_order",
                Access::Private,
                Method::GET,
                "order/{id}/",
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
        self.fetch_orders_with_status("fetch_orders", None, symbol, page)
            .await
    }

    async fn fetch_open_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders_with_status("fetch_open_orders", Some("1"), symbol, page)
            .await
    }

    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders_with_status("fetch_closed_orders", Some("3"), symbol, page)
            .await
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_my_trades")?;
        let market = self.market_opt(symbol).await?;
        let mut request = Params::new();
        insert_opt(&mut request, "pair", market.as_ref().map(|m| m.id.clone()));
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request("fetch_my_trades", Access::Private, Method::GET, "exchanges/own/", request)
            .await?;
        let rows: Vec<Value> = decode("trades", response)?;
        let trades = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_trade(row, None, &index))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_deposits(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("fetch_deposits", "deposits/", TransactionType::Deposit, code, page)
            .await
    }

    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions(
            "fetch_withdrawals",
            "withdraws/",
            TransactionType::Withdrawal,
            code,
            page,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{ErrorKind, Side, WithdrawRequest};
    use rust_decimal_macros::dec;

    #[test]
    fn test_canceled_order_reports_response_only() {
        let order = canceled_order(json!({"order": 63568}));
        assert_eq!(order.id.as_deref(), Some("63568"));
        assert_eq!(order.status, None);
        assert_eq!(order.symbol, None);
        assert_eq!(order.amount, None);

        let order = canceled_order(json!({}));
        assert_eq!(order.id, None);
    }

    #[test]
    fn test_create_order_body() {
        let market = Market::stub("ETH_BTC", "ETH", "BTC");
        let request = CreateOrderRequest::limit("ETH/BTC", Side::Buy, dec!(1.25), dec!(0.05));
        let body = create_order_body(&request, &market).unwrap();
        assert_eq!(
            Value::Object(body),
            json!({"pair": "ETH_BTC", "type": "buy", "amount": "1.25", "price": "0.05"})
        );
    }

    #[test]
    fn test_market_orders_rejected() {
        let market = Market::stub("ETH_BTC", "ETH", "BTC");
        let request = CreateOrderRequest::market("ETH/BTC", Side::Sell, dec!(1));
        let err = create_order_body(&request, &market).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOrder));
    }

    #[tokio::test]
    async fn test_not_supported_private_surface() {
        let client = BtcAlphaClient::new();
        assert_eq!(
            client.cancel_all_orders(None).await.unwrap_err().kind(),
            Some(ErrorKind::NotSupported)
        );
        assert_eq!(
            client.fetch_deposit_address("BTC", None).await.unwrap_err().kind(),
            Some(ErrorKind::NotSupported)
        );
        let request = WithdrawRequest::new("BTC", dec!(1), "addr");
        assert_eq!(
            client.withdraw(&request).await.unwrap_err().kind(),
            Some(ErrorKind::NotSupported)
        );
    }
}
