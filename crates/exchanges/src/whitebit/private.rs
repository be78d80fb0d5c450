use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use interface::{
    model::filter_by_since_limit, Balances, CreateOrderRequest, DepositAddress, ExchangeError,
    ExchangeId, Market, MarketIndex, Order, OrderStatus, OrderType, Page, Params, TimeInForce,
    Trade, Transaction, TransactionType, WithdrawRequest,
};

use super::{parse, BalanceAccount, WhitebitApi, WhitebitClient};
use crate::{
    request::{decimal_value, decode, insert_opt, params},
    PrivateExchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::Whitebit;
const MAX_HISTORY_LIMIT: usize = 100;

/// 브로커 접두어 뒤에 붙는 임의 16자
fn uuid16() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(16).collect()
}

fn order_id(method_name: &'static str, id: &str) -> Result<i64, ExchangeError> {
    id.parse::<i64>().map_err(|_| {
        ExchangeError::bad_request(ID, method_name, format!("order id must be numeric, got {:?}", id))
    })
}

/// 주문 종류별 엔드포인트와 본문. 트리거 가격이 있으면 stop 주문으로 보낸다.
fn create_order_body(
    request: &CreateOrderRequest,
    market: &Market,
    broker_id: Option<&str>,
) -> Result<(&'static str, Params), ExchangeError> {
    let mut body = params(json!({
        "market": market.id,
        "side": request.side.as_str(),
        "amount": decimal_value(request.amount),
    }));
    let client_order_id = match (&request.client_order_id, broker_id) {
        (Some(id), _) => Some(id.clone()),
        (None, Some(broker)) => Some(format!("{}{}", broker, uuid16())),
        (None, None) => None,
    };
    insert_opt(&mut body, "clientOrderId", client_order_id);
    let is_market = request.order_type == OrderType::Market;
    let post_only = request.post_only || request.time_in_force == Some(TimeInForce::Po);
    if post_only && !is_market {
        body.insert("postOnly".into(), json!(true));
    }
    let price = |body: &mut Params| -> Result<(), ExchangeError> {
        let price = request
            .price
            .ok_or_else(|| ExchangeError::arguments_required(ID, "create_order", "a price"))?;
        body.insert("price".into(), decimal_value(price));
        Ok(())
    };
    let path = match (&request.order_type, request.trigger_price) {
        (OrderType::Limit, Some(trigger)) => {
            body.insert("activation_price".into(), decimal_value(trigger));
            price(&mut body)?;
            "order/stop_limit"
        }
        (OrderType::Market, Some(trigger)) => {
            body.insert("activation_price".into(), decimal_value(trigger));
            "order/stop_market"
        }
        (OrderType::Limit, None) => {
            price(&mut body)?;
            "order/new"
        }
        (OrderType::Market, None) => "order/stock_market",
        (other, _) => {
            return Err(ExchangeError::invalid_order(
                ID,
                "create_order",
                format!("{} does not support {} orders", ID, other),
            ))
        }
    };
    Ok((path, body))
}

impl WhitebitClient {
    async fn post(
        &self,
        method_name: &'static str,
        path: &str,
        body: Params,
    ) -> Result<Value, ExchangeError> {
        self.request(method_name, WhitebitApi::V4Private, Method::POST, path, body)
            .await
    }

    fn ensure_not_fiat(&self, method_name: &'static str, code: &str) -> Result<(), ExchangeError> {
        if self.options.is_fiat(code) {
            return Err(ExchangeError::arguments_required(
                ID,
                method_name,
                &format!("a provider when the ticker is fiat ({})", code),
            ));
        }
        Ok(())
    }

    async fn currency_id(&self, method_name: &'static str, code: &str) -> Result<String, ExchangeError> {
        self.load_markets(false).await?;
        Ok(self.index.read().await.currency_or_err(code, method_name)?.id.clone())
    }

    /// main-account/history. transactionMethod 1 = 입금, 2 = 출금
    async fn fetch_history(
        &self,
        method_name: &'static str,
        tx_type: TransactionType,
        code: Option<&str>,
        mut request: Params,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let method = match tx_type {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal => 2,
        };
        request.insert("transactionMethod".into(), json!(method));
        request.insert("offset".into(), json!(0));
        match code {
            Some(code) => {
                let ticker = self.currency_id(method_name, code).await?;
                request.insert("ticker".into(), json!(ticker));
            }
            None => {
                self.load_markets(false).await?;
            }
        }
        let response = self.post(method_name, "main-account/history", request).await?;
        let index = self.index.read().await;
        parse::records(&response)
            .iter()
            .map(|row| parse::parse_transaction(row, code, &index))
            .collect()
    }

    async fn fetch_transactions_of(
        &self,
        method_name: &'static str,
        tx_type: TransactionType,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        let limit = page.limit.map_or(MAX_HISTORY_LIMIT, |l| l.min(MAX_HISTORY_LIMIT));
        let mut transactions = self
            .fetch_history(method_name, tx_type, code, params(json!({ "limit": limit })))
            .await?;
        transactions.sort_by_key(|t| t.timestamp);
        Ok(filter_by_since_limit(transactions, page.since, page.limit))
    }

    /// 입금 한 건. uniqueId 로 찾고 없으면 None
    pub async fn fetch_deposit(
        &self,
        id: &str,
        code: Option<&str>,
    ) -> Result<Option<Transaction>, ExchangeError> {
        self.config.credentials(ID, "fetch_deposit")?;
        let request = params(json!({ "uniqueId": id, "limit": 1 }));
        Ok(self
            .fetch_history("fetch_deposit", TransactionType::Deposit, code, request)
            .await?
            .into_iter()
            .next())
    }

    /// 주문 하나의 체결 내역
    pub async fn fetch_order_trades(
        &self,
        id: &str,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_order_trades")?;
        let mut request = params(json!({ "orderId": order_id("fetch_order_trades", id)? }));
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("market".into(), json!(market.id));
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        insert_opt(&mut request, "limit", page.limit.map(|l| l.min(MAX_HISTORY_LIMIT)));
        let response = self
            .post("fetch_order_trades", "trade-account/order", request)
            .await?;
        let index = self.index.read().await;
        let trades = parse::records(&response)
            .iter()
            .map(|row| {
                let market = match row.get("market").and_then(Value::as_str) {
                    Some(id) => index.safe_market(id, market.as_ref(), Some("_")),
                    None => market.clone().unwrap_or_default(),
                };
                parse::parse_trade(row, &market)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }
}

/// 출금 응답에는 id 가 없어서 보낸 uniqueId 를 붙인다
fn withdrawal(
    response: Value,
    unique_id: String,
    code: &str,
    index: &MarketIndex,
) -> Result<Transaction, ExchangeError> {
    // 성공 응답 본문은 비어 있다
    let info = if response.is_object() { response.clone() } else { json!({}) };
    let mut transaction = parse::parse_transaction(&info, Some(code), index)?;
    transaction.id = Some(unique_id);
    transaction.tx_type = Some(TransactionType::Withdrawal);
    transaction.info = response;
    Ok(transaction)
}

#[async_trait]
impl PrivateExchange for WhitebitClient {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.config.credentials(ID, "fetch_balance")?;
        self.load_markets(false).await?;
        let path = match self.options.balance_account {
            BalanceAccount::Main => "main-account/balance",
            BalanceAccount::Trade => "trade-account/balance",
        };
        let response = self.post("fetch_balance", path, Params::new()).await?;
        let index = self.index.read().await;
        Ok(parse::parse_balance(&response, &index))
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "create_order")?;
        request.validate(ID, "create_order")?;
        let market = self.market(&request.symbol).await?;
        let (path, body) = create_order_body(request, &market, self.options.broker_id.as_deref())?;
        let response = self.post("create_order", path, body).await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        let symbol =
            symbol.ok_or_else(|| ExchangeError::arguments_required(ID, "cancel_order", "a symbol"))?;
        let order_id = order_id("cancel_order", id)?;
        let market = self.market(symbol).await?;
        let response = self
            .post(
                "cancel_order",
                "order/cancel",
                params(json!({ "market": market.id, "orderId": order_id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
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
        let mut request = params(json!({ "market": market.id }));
        insert_opt(&mut request, "limit", page.limit.map(|l| l.min(MAX_HISTORY_LIMIT)));
        let response = self.post("fetch_open_orders", "orders", request).await?;
        let rows: Vec<Value> = decode("orders", response)?;
        let index = self.index.read().await;
        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = parse::parse_order(row, Some(&market), &index)?;
            order.status = Some(OrderStatus::Open);
            orders.push(order);
        }
        orders.sort_by_key(|o| o.timestamp);
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    /// 응답은 마켓 id 별 묶음
    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "fetch_closed_orders")?;
        let mut request = Params::new();
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("market".into(), json!(market.id));
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        insert_opt(&mut request, "limit", page.limit.map(|l| l.min(MAX_HISTORY_LIMIT)));
        let response = self
            .post("fetch_closed_orders", "trade-account/order/history", request)
            .await?;
        let by_market: serde_json::Map<String, Value> = decode("order history", response)?;
        let index = self.index.read().await;
        let mut orders = Vec::new();
        for (id, rows) in &by_market {
            let row_market = index.safe_market(id, None, Some("_"));
            for row in rows.as_array().map(Vec::as_slice).unwrap_or_default() {
                let mut order = parse::parse_order(row, Some(&row_market), &index)?;
                order.status = Some(OrderStatus::Closed);
                orders.push(order);
            }
        }
        if let Some(market) = &market {
            orders.retain(|o| o.symbol.as_deref() == Some(market.symbol.as_str()));
        }
        orders.sort_by_key(|o| o.timestamp);
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_my_trades")?;
        let mut request = Params::new();
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("market".into(), json!(market.id));
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .post("fetch_my_trades", "trade-account/executed-history", request)
            .await?;
        let index = self.index.read().await;
        let trades = parse::parse_my_trades(&response, market.as_ref(), &index)?;
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

    /// 법정화폐는 결제 제공자 지정이 필요해 지원하지 않는다
    async fn fetch_deposit_address(
        &self,
        code: &str,
        _network: Option<&str>,
    ) -> Result<DepositAddress, ExchangeError> {
        self.config.credentials(ID, "fetch_deposit_address")?;
        self.ensure_not_fiat("fetch_deposit_address", code)?;
        let ticker = self.currency_id("fetch_deposit_address", code).await?;
        let response = self
            .post(
                "fetch_deposit_address",
                "main-account/address",
                params(json!({ "ticker": ticker })),
            )
            .await?;
        parse::parse_deposit_address(&response, code)
    }

    /// uniqueId 를 만들어 보내고 그 값을 출금 id 로 돌려준다
    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.config.credentials(ID, "withdraw")?;
        request.validate(ID, "withdraw")?;
        self.ensure_not_fiat("withdraw", &request.code)?;
        let ticker = self.currency_id("withdraw", &request.code).await?;
        let unique_id = uuid::Uuid::new_v4().to_string();
        let mut body = params(json!({
            "ticker": ticker,
            "amount": decimal_value(request.amount),
            "address": request.address,
            "uniqueId": unique_id,
        }));
        insert_opt(&mut body, "memo", request.tag.clone());
        insert_opt(&mut body, "network", request.network.clone());
        let response = self.post("withdraw", "main-account/withdraw", body).await?;
        let index = self.index.read().await;
        withdrawal(response, unique_id, &request.code, &index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{ErrorKind, ExchangeConfig, Side, TriggerDirection};
    use rust_decimal_macros::dec;

    fn signed_client() -> WhitebitClient {
        WhitebitClient::with_config(
            ExchangeConfig::new()
                .with_api_key("key")
                .with_secret("secret"),
        )
        .unwrap()
    }

    fn market() -> Market {
        Market::stub("BTC_USDT", "BTC", "USDT")
    }

    #[test]
    fn test_order_endpoints_by_type() {
        let limit = CreateOrderRequest::limit("BTC/USDT", Side::Buy, dec!(0.01), dec!(30000))
            .with_post_only(true);
        let (path, body) = create_order_body(&limit, &market(), None).unwrap();
        assert_eq!(path, "order/new");
        assert_eq!(body["price"], "30000");
        assert_eq!(body["postOnly"], true);
        assert!(body.get("clientOrderId").is_none());

        let market_order = CreateOrderRequest::market("BTC/USDT", Side::Sell, dec!(0.01));
        let (path, body) = create_order_body(&market_order, &market(), None).unwrap();
        assert_eq!(path, "order/stock_market");
        assert!(body.get("price").is_none());

        let stop_limit = CreateOrderRequest::limit("BTC/USDT", Side::Sell, dec!(1), dec!(29000))
            .with_trigger(dec!(29500), TriggerDirection::Below);
        let (path, body) = create_order_body(&stop_limit, &market(), None).unwrap();
        assert_eq!(path, "order/stop_limit");
        assert_eq!(body["activation_price"], "29500");
        assert_eq!(body["price"], "29000");

        let stop_market = CreateOrderRequest::market("BTC/USDT", Side::Sell, dec!(1))
            .with_trigger(dec!(29500), TriggerDirection::Below);
        let (path, _) = create_order_body(&stop_market, &market(), None).unwrap();
        assert_eq!(path, "order/stop_market");

        let other = CreateOrderRequest::new(
            "BTC/USDT",
            OrderType::Other("trailing".to_string()),
            Side::Buy,
            dec!(1),
        );
        let err = create_order_body(&other, &market(), None).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOrder));
    }

    #[test]
    fn test_client_order_id() {
        let request = CreateOrderRequest::market("BTC/USDT", Side::Buy, dec!(1));
        let (_, body) = create_order_body(&request, &market(), Some("broker")).unwrap();
        let id = body["clientOrderId"].as_str().unwrap();
        assert!(id.starts_with("broker"));
        assert_eq!(id.len(), "broker".len() + 16);

        let request = request.with_client_order_id("mine");
        let (_, body) = create_order_body(&request, &market(), Some("broker")).unwrap();
        assert_eq!(body["clientOrderId"], "mine");
    }

    #[test]
    fn test_withdrawal_keeps_only_returned_fields() {
        let index = MarketIndex::new(ExchangeId::Whitebit, &[]);
        let tx = withdrawal(json!([]), "u-1".to_string(), "BTC", &index).unwrap();
        assert_eq!(tx.id.as_deref(), Some("u-1"));
        assert_eq!(tx.tx_type, Some(TransactionType::Withdrawal));
        assert_eq!(tx.currency.as_deref(), Some("BTC"));
        assert_eq!(tx.amount, None);
        assert_eq!(tx.address, None);
        assert_eq!(tx.tag, None);
        assert_eq!(tx.status, None);
    }

    #[tokio::test]
    async fn test_arguments_checked_before_network() {
        let client = signed_client();
        let err = client.cancel_order("1", None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ArgumentsRequired));
        let err = client.fetch_open_orders(None, Page::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ArgumentsRequired));
        let err = client.cancel_order("abc", Some("BTC/USDT")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadRequest));
        let err = client.fetch_deposit_address("EUR", None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ArgumentsRequired));
        let err = client
            .withdraw(&WithdrawRequest::new("USD", dec!(10), "card"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ArgumentsRequired));
    }

    #[tokio::test]
    async fn test_unsupported_and_credentials() {
        let client = WhitebitClient::new();
        let err = client.fetch_order("1", Some("BTC/USDT")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotSupported));
        let err = client.cancel_all_orders(None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotSupported));
        let err = client.fetch_order_trades("1", None, Page::new()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
        let err = client.fetch_deposit("1", None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
    }
}
