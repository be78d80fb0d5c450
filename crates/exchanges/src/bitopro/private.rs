use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use interface::{
    model::filter_by_since_limit, time::milliseconds, Access, Balances, CreateOrderRequest,
    ErrorKind, ExchangeError, ExchangeId, Market, Order, OrderType, Page, Params, Trade,
    Transaction, TransactionType, TriggerDirection, WithdrawRequest,
};

use super::{parse, BitoproClient};
use crate::{
    request::{decimal_value, insert_opt, params},
    PrivateExchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::Bitopro;

/// 주문 조회의 statusKind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    All,
    Open,
    Done,
}

impl StatusKind {
    fn as_str(&self) -> &'static str {
        match self {
            StatusKind::All => "ALL",
            StatusKind::Open => "OPEN",
            StatusKind::Done => "DONE",
        }
    }
}

/// orders/{pair} 본문. trigger_price 가 있는 지정가는 stop_limit 으로 보낸다.
fn create_order_body(
    request: &CreateOrderRequest,
    market: &Market,
    timestamp: i64,
) -> Result<Params, ExchangeError> {
    let order_type = match (&request.order_type, request.trigger_price) {
        (OrderType::Market, _) => "market",
        (OrderType::Limit, None) => "limit",
        (OrderType::Limit, Some(_)) => "stop_limit",
        (OrderType::Other(raw), _) if raw == "stop_limit" => "stop_limit",
        (other, _) => {
            return Err(ExchangeError::invalid_order(
                ID,
                "create_order",
                format!("{} does not support {} orders", ID, other),
            ))
        }
    };
    let mut body = params(json!({
        "pair": market.id,
        "type": order_type,
        "action": request.side.as_str(),
        "amount": decimal_value(request.amount),
        "timestamp": timestamp,
    }));
    if order_type != "market" {
        let price = request
            .price
            .ok_or_else(|| ExchangeError::arguments_required(ID, "create_order", "a price"))?;
        body.insert("price".into(), decimal_value(price));
    }
    if order_type == "stop_limit" {
        let stop_price = request.trigger_price.ok_or_else(|| {
            ExchangeError::invalid_order(ID, "create_order", "stop_limit orders require a trigger price")
        })?;
        let condition = match request.trigger_direction {
            Some(TriggerDirection::Above) => ">=",
            Some(TriggerDirection::Below) => "<=",
            None => {
                return Err(ExchangeError::invalid_order(
                    ID,
                    "create_order",
                    "stop_limit orders require a trigger direction",
                ))
            }
        };
        body.insert("stopPrice".into(), decimal_value(stop_price));
        body.insert("condition".into(), json!(condition));
    }
    if request.post_only && order_type != "market" {
        body.insert("timeInForce".into(), json!("POST_ONLY"));
    }
    Ok(body)
}

impl BitoproClient {
    async fn required_market(
        &self,
        method_name: &'static str,
        symbol: Option<&str>,
    ) -> Result<Market, ExchangeError> {
        let symbol =
            symbol.ok_or_else(|| ExchangeError::arguments_required(ID, method_name, "a symbol"))?;
        self.market(symbol).await
    }

    async fn parse_order_rows(
        &self,
        rows: &[Value],
        market: Option<&Market>,
    ) -> Result<Vec<Order>, ExchangeError> {
        let index = self.index.read().await;
        rows.iter()
            .map(|row| parse::parse_order(row, market, &index))
            .collect()
    }

    async fn fetch_orders_by_status(
        &self,
        method_name: &'static str,
        status: StatusKind,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        let market = self.required_market(method_name, symbol).await?;
        let mut request = params(json!({ "pair": market.id }));
        if status != StatusKind::All {
            request.insert("statusKind".into(), json!(status.as_str()));
        }
        insert_opt(&mut request, "startTimestamp", page.since);
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request(method_name, Access::Private, Method::GET, "orders/all/{pair}", request)
            .await?;
        let rows = parse::data_rows(&response)?;
        self.parse_order_rows(&rows, Some(&market)).await
    }

    async fn fetch_transactions_of(
        &self,
        method_name: &'static str,
        tx_type: TransactionType,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        let code = code.ok_or_else(|| ExchangeError::arguments_required(ID, method_name, "a code"))?;
        self.load_markets(false).await?;
        let currency_id = self.index.read().await.currency_or_err(code, method_name)?.id.clone();
        let path = match tx_type {
            TransactionType::Deposit => "wallet/depositHistory/{currency}",
            TransactionType::Withdrawal => "wallet/withdrawHistory/{currency}",
        };
        let mut request = params(json!({ "currency": currency_id }));
        insert_opt(&mut request, "startTimestamp", page.since);
        insert_opt(&mut request, "limit", page.limit);
        let response = self
            .request(method_name, Access::Private, Method::GET, path, request)
            .await?;
        let index = self.index.read().await;
        let transactions = parse::data_rows(&response)?
            .iter()
            .map(|row| {
                parse::parse_transaction(row, Some(tx_type), Some(code), &index, |id| {
                    self.options.network_code(id)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter_by_since_limit(transactions, page.since, page.limit))
    }

    /// 여러 주문을 한 번에 취소한다. 같은 마켓의 주문만 받는다.
    pub async fn cancel_orders(
        &self,
        ids: &[String],
        symbol: Option<&str>,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "cancel_orders")?;
        let market = self.required_market("cancel_orders", symbol).await?;
        let mut request = Params::new();
        request.insert(market.id.to_uppercase(), json!(ids));
        let response = self
            .request("cancel_orders", Access::Private, Method::PUT, "orders", request)
            .await?;
        let index = self.index.read().await;
        Ok(parse::parse_canceled_ids(&response, &index))
    }

    /// serial 로 출금 한 건을 조회한다
    pub async fn fetch_withdrawal(&self, id: &str, code: &str) -> Result<Transaction, ExchangeError> {
        self.config.credentials(ID, "fetch_withdrawal")?;
        self.load_markets(false).await?;
        let currency_id = self
            .index
            .read()
            .await
            .currency_or_err(code, "fetch_withdrawal")?
            .id
            .clone();
        let response = self
            .request(
                "fetch_withdrawal",
                Access::Private,
                Method::GET,
                "wallet/withdraw/{currency}/{serial}",
                params(json!({ "currency": currency_id, "serial": id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_transaction(
            &parse::data(&response),
            Some(TransactionType::Withdrawal),
            Some(code),
            &index,
            |id| self.options.network_code(id),
        )
    }
}

#[async_trait]
impl PrivateExchange for BitoproClient {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.config.credentials(ID, "fetch_balance")?;
        self.load_markets(false).await?;
        let response = self
            .request("fetch_balance", Access::Private, Method::GET, "accounts/balance", Params::new())
            .await?;
        let index = self.index.read().await;
        parse::parse_balance(&response, &index)
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "create_order")?;
        request.validate(ID, "create_order")?;
        let market = self.market(&request.symbol).await?;
        let body = create_order_body(request, &market, milliseconds())?;
        let response = self
            .request("create_order", Access::Private, Method::POST, "orders/{pair}", body)
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        let market = self.required_market("cancel_order", symbol).await?;
        let response = self
            .request(
                "cancel_order",
                Access::Private,
                Method::DELETE,
                "orders/{pair}/{id}",
                params(json!({ "pair": market.id, "id": id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "cancel_all_orders")?;
        let (path, request) = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                ("orders/{pair}", params(json!({ "pair": market.id })))
            }
            None => {
                self.load_markets(false).await?;
                ("orders/all", Params::new())
            }
        };
        let response = self
            .request("cancel_all_orders", Access::Private, Method::DELETE, path, request)
            .await?;
        let index = self.index.read().await;
        Ok(parse::parse_canceled_ids(&response, &index))
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "fetch_order")?;
        let market = self.required_market("fetch_order", symbol).await?;
        let response = self
            .request(
                "fetch_order",
                Access::Private,
                Method::GET,
                "orders/{pair}/{orderId}",
                params(json!({ "pair": market.id, "orderId": id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn fetch_orders(&self, symbol: Option<&str>, page: Page) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders_by_status("fetch_orders", StatusKind::All, symbol, page)
            .await
    }

    async fn fetch_open_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders_by_status("fetch_open_orders", StatusKind::Open, symbol, page)
            .await
    }

    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders_by_status("fetch_closed_orders", StatusKind::Done, symbol, page)
            .await
    }

    async fn fetch_my_trades(&self, symbol: Option<&str>, page: Page) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_my_trades")?;
        let market = self.required_market("fetch_my_trades", symbol).await?;
        let response = self
            .request(
                "fetch_my_trades",
                Access::Private,
                Method::GET,
                "orders/trades/{pair}",
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

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.config.credentials(ID, "withdraw")?;
        request.validate(ID, "withdraw")?;
        // 네트워크를 모르면 요청 전에 거절한다
        let protocol = match request.network.as_deref() {
            Some(network) => self
                .options
                .network_id(network)
                .ok_or_else(|| {
                    ExchangeError::new(
                        ErrorKind::Exchange,
                        ID,
                        "withdraw",
                        format!("{} invalid network {}", ID, network),
                    )
                })?
                .to_string(),
            None => "MAIN".to_string(),
        };
        self.load_markets(false).await?;
        let currency_id = self
            .index
            .read()
            .await
            .currency_or_err(&request.code, "withdraw")?
            .id
            .clone();
        let mut body = params(json!({
            "currency": currency_id,
            "amount": decimal_value(request.amount),
            "address": request.address,
            "protocol": protocol,
        }));
        insert_opt(&mut body, "message", request.tag.clone());
        let response = self
            .request(
                "withdraw",
                Access::Private,
                Method::POST,
                "wallet/withdraw/{currency}",
                body,
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_transaction(
            &parse::data(&response),
            Some(TransactionType::Withdrawal),
            Some(&request.code),
            &index,
            |id| self.options.network_code(id),
        )
    }
}
