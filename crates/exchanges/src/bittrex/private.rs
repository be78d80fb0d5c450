use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use interface::{
    de::value_string,
    model::filter_by_since_limit,
    time::{iso8601, iso8601_seconds},
    Access, Balances, CreateOrderRequest, DepositAddress, ErrorKind, ExchangeError, ExchangeId,
    Market, Order, OrderStatus, Page, Params, Trade, TradingFee, Transaction,
    TransactionStatus, TriggerDirection, WithdrawRequest,
};

use super::{parse, BittrexClient};
use crate::{
    request::{decimal_value, decode, insert_opt, params},
    PrivateExchange, PublicExchange,
};

const ID: ExchangeId = ExchangeId::Bittrex;

/// 입출금 조회 대상 엔드포인트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Deposits,
    Withdrawals,
}

impl Direction {
    fn path(self, status: &TransactionStatus) -> &'static str {
        let pending = *status == TransactionStatus::Pending;
        match (self, pending) {
            (Direction::Deposits, true) => "deposits/open",
            (Direction::Deposits, false) => "deposits/closed",
            (Direction::Withdrawals, true) => "withdrawals/open",
            (Direction::Withdrawals, false) => "withdrawals/closed",
        }
    }
}

/// 일반 주문 필드. 조건부 주문이면 orderToCreate 안에 들어간다.
fn order_fields(request: &CreateOrderRequest, market: &Market) -> Result<Params, ExchangeError> {
    let market_symbol = format!("{}-{}", market.base_id, market.quote_id);
    let order_type = request.order_type.as_str().to_uppercase();
    let mut fields = params(json!({
        "marketSymbol": market_symbol,
        "direction": request.side.as_str().to_uppercase(),
        "type": order_type,
    }));
    match order_type.as_str() {
        "CEILING_LIMIT" => {
            let price = request.price.ok_or_else(|| {
                ExchangeError::arguments_required(ID, "create_order", "a price for ceiling_limit orders")
            })?;
            fields.insert("limit".into(), decimal_value(price));
            let ceiling = request.cost.unwrap_or(request.amount);
            fields.insert("ceiling".into(), decimal_value(ceiling));
            fields.insert("timeInForce".into(), "IMMEDIATE_OR_CANCEL".into());
        }
        "CEILING_MARKET" => {
            let ceiling = match (request.cost, request.price) {
                (Some(cost), _) => cost,
                (None, Some(price)) => request.amount * price,
                (None, None) => request.amount,
            };
            fields.insert("ceiling".into(), decimal_value(ceiling));
            fields.insert("timeInForce".into(), "IMMEDIATE_OR_CANCEL".into());
        }
        "LIMIT" => {
            fields.insert("quantity".into(), decimal_value(request.amount));
            insert_opt(&mut fields, "limit", request.price.map(decimal_value));
            fields.insert("timeInForce".into(), "GOOD_TIL_CANCELLED".into());
        }
        "MARKET" => {
            fields.insert("quantity".into(), decimal_value(request.amount));
            fields.insert("timeInForce".into(), "IMMEDIATE_OR_CANCEL".into());
        }
        other => {
            return Err(ExchangeError::invalid_order(
                ID,
                "create_order",
                format!("{} does not support {} orders", ID, other.to_lowercase()),
            ))
        }
    }
    insert_opt(&mut fields, "clientOrderId", request.client_order_id.clone());
    Ok(fields)
}

/// create_order 요청 본문과 엔드포인트
fn create_order_request(
    request: &CreateOrderRequest,
    market: &Market,
) -> Result<(&'static str, Params), ExchangeError> {
    let fields = order_fields(request, market)?;
    if request.trigger_price.is_none() && request.trailing_percent.is_none() {
        return Ok(("orders", fields));
    }
    let operand = match request.trigger_direction {
        Some(TriggerDirection::Above) => "GTE",
        Some(TriggerDirection::Below) => "LTE",
        None => {
            return Err(ExchangeError::arguments_required(
                ID,
                "create_order",
                "an operand (trigger direction) for conditional orders",
            ))
        }
    };
    let mut body = params(json!({
        "marketSymbol": format!("{}-{}", market.base_id, market.quote_id),
        "operand": operand,
        "orderToCreate": Value::Object(fields),
    }));
    match request.trigger_price {
        Some(price) => {
            body.insert("triggerPrice".into(), decimal_value(price));
        }
        None => insert_opt(&mut body, "trailingStopPercent", request.trailing_percent.map(decimal_value)),
    }
    Ok(("conditional-orders", body))
}

fn deposit_address(code: &str, response: Value) -> Result<DepositAddress, ExchangeError> {
    let address = response.get("cryptoAddress").and_then(value_string);
    let status = response.get("status").and_then(value_string);
    match address {
        Some(address) if status.as_deref() != Some("REQUESTED") => Ok(DepositAddress {
            currency: code.to_string(),
            address,
            tag: response.get("cryptoAddressTag").and_then(value_string),
            network: None,
            info: response,
        }),
        _ => Err(ExchangeError::new(
            ErrorKind::AddressPending,
            ID,
            "fetch_deposit_address",
            format!(
                "{} the address for {} is being generated (pending, not ready yet, retry again later)",
                ID, code
            ),
        )),
    }
}

impl BittrexClient {
    async fn private_get(
        &self,
        method_name: &'static str,
        path: &str,
        request: Params,
    ) -> Result<Value, ExchangeError> {
        self.request(method_name, Access::Private, Method::GET, path, request)
            .await
    }

    async fn parse_orders(
        &self,
        response: Value,
        market: Option<&Market>,
    ) -> Result<Vec<Order>, ExchangeError> {
        let rows: Vec<Value> = decode("orders", response)?;
        let index = self.index.read().await;
        rows.iter()
            .map(|row| parse::parse_order(row, market, &index))
            .collect()
    }

    async fn parse_transactions(&self, response: Value) -> Result<Vec<Transaction>, ExchangeError> {
        let rows: Vec<Value> = decode("transactions", response)?;
        let index = self.index.read().await;
        rows.iter()
            .map(|row| parse::parse_transaction(row, &index))
            .collect()
    }

    async fn currency_id(&self, code: &str, method_name: &'static str) -> Result<String, ExchangeError> {
        self.load_markets(false).await?;
        let index = self.index.read().await;
        Ok(index.currency_or_err(code, method_name)?.id.clone())
    }

    async fn fetch_transfers(
        &self,
        method_name: &'static str,
        direction: Direction,
        status: TransactionStatus,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        let mut request = Params::new();
        if let Some(code) = code {
            request.insert("currencySymbol".into(), self.currency_id(code, method_name).await?.into());
        } else {
            self.load_markets(false).await?;
        }
        if let Some(since) = page.since {
            insert_opt(&mut request, "startDate", iso8601(since / 1000 * 1000));
        }
        insert_opt(&mut request, "pageSize", page.limit);
        let response = self
            .private_get(method_name, direction.path(&status), request)
            .await?;
        let transactions = self.parse_transactions(response).await?;
        Ok(filter_by_since_limit(transactions, page.since, page.limit))
    }

    /// status 를 지정해서 입금 조회. Pending 이면 진행 중 입금만.
    pub async fn fetch_deposits_with_status(
        &self,
        status: TransactionStatus,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transfers("fetch_deposits", Direction::Deposits, status, code, page)
            .await
    }

    pub async fn fetch_withdrawals_with_status(
        &self,
        status: TransactionStatus,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transfers("fetch_withdrawals", Direction::Withdrawals, status, code, page)
            .await
    }

    pub async fn fetch_deposit(&self, txid: &str) -> Result<Option<Transaction>, ExchangeError> {
        self.fetch_transfer_by_txid("fetch_deposit", "deposits/ByTxId/{txId}", txid)
            .await
    }

    pub async fn fetch_withdrawal(&self, txid: &str) -> Result<Option<Transaction>, ExchangeError> {
        self.fetch_transfer_by_txid("fetch_withdrawal", "withdrawals/ByTxId/{txId}", txid)
            .await
    }

    async fn fetch_transfer_by_txid(
        &self,
        method_name: &'static str,
        path: &str,
        txid: &str,
    ) -> Result<Option<Transaction>, ExchangeError> {
        self.config.credentials(ID, method_name)?;
        self.load_markets(false).await?;
        let response = self
            .private_get(method_name, path, params(json!({ "txId": txid })))
            .await?;
        Ok(self.parse_transactions(response).await?.into_iter().next())
    }

    /// 주문 하나의 체결 내역
    pub async fn fetch_order_trades(
        &self,
        id: &str,
        symbol: Option<&str>,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_order_trades")?;
        let market = match symbol {
            Some(symbol) => Some(self.market(symbol).await?),
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .private_get(
                "fetch_order_trades",
                "orders/{orderId}/executions",
                params(json!({ "orderId": id })),
            )
            .await?;
        let rows: Vec<Value> = decode("executions", response)?;
        let index = self.index.read().await;
        rows.iter()
            .map(|row| parse::parse_trade(row, market.as_ref(), &index))
            .collect()
    }

    /// conditional-orders 로 만든 주문 취소
    pub async fn cancel_conditional_order(&self, id: &str) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        self.load_markets(false).await?;
        let response = self
            .request(
                "cancel_order",
                Access::Private,
                Method::DELETE,
                "conditional-orders/{conditionalOrderId}",
                params(json!({ "conditionalOrderId": id })),
            )
            .await?;
        let index = self.index.read().await;
        let mut order = parse::parse_order(&response, None, &index)?;
        order.id = Some(id.to_string());
        order.status = Some(OrderStatus::Canceled);
        order.info = response;
        Ok(order)
    }

    pub async fn create_deposit_address(&self, code: &str) -> Result<DepositAddress, ExchangeError> {
        self.config.credentials(ID, "create_deposit_address")?;
        let currency_id = self.currency_id(code, "create_deposit_address").await?;
        let response = self
            .request(
                "create_deposit_address",
                Access::Private,
                Method::POST,
                "addresses",
                params(json!({ "currencySymbol": currency_id })),
            )
            .await?;
        deposit_address(code, response)
    }

    pub async fn fetch_trading_fee(&self, symbol: &str) -> Result<TradingFee, ExchangeError> {
        self.config.credentials(ID, "fetch_trading_fee")?;
        let market = self.market(symbol).await?;
        let response = self
            .private_get(
                "fetch_trading_fee",
                "account/fees/trading/{marketSymbol}",
                params(json!({ "marketSymbol": market.id })),
            )
            .await?;
        let index = self.index.read().await;
        parse::parse_trading_fee(&response, Some(&market), &index)
    }

    pub async fn fetch_trading_fees(&self) -> Result<BTreeMap<String, TradingFee>, ExchangeError> {
        self.config.credentials(ID, "fetch_trading_fees")?;
        self.load_markets(false).await?;
        let response = self
            .private_get("fetch_trading_fees", "account/fees/trading", Params::new())
            .await?;
        let rows: Vec<Value> = decode("trading fees", response)?;
        let index = self.index.read().await;
        let mut out = BTreeMap::new();
        for row in &rows {
            let fee = parse::parse_trading_fee(row, None, &index)?;
            out.insert(fee.symbol.clone(), fee);
        }
        Ok(out)
    }
}

#[async_trait]
impl PrivateExchange for BittrexClient {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.config.credentials(ID, "fetch_balance")?;
        self.load_markets(false).await?;
        let response = self
            .private_get("fetch_balance", "balances", Params::new())
            .await?;
        let index = self.index.read().await;
        parse::parse_balance(&response, &index)
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "create_order")?;
        request.validate(ID, "create_order")?;
        let market = self.market(&request.symbol).await?;
        let (path, body) = create_order_request(request, &market)?;
        let response = self
            .request("create_order", Access::Private, Method::POST, path, body)
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, Some(&market), &index)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "cancel_order")?;
        let market = match symbol {
            Some(symbol) => Some(self.market(symbol).await?),
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .request(
                "cancel_order",
                Access::Private,
                Method::DELETE,
                "orders/{orderId}",
                params(json!({ "orderId": id })),
            )
            .await?;
        let index = self.index.read().await;
        let mut order = parse::parse_order(&response, market.as_ref(), &index)?;
        order.id = Some(id.to_string());
        order.status = Some(OrderStatus::Canceled);
        order.info = response;
        Ok(order)
    }

    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "cancel_all_orders")?;
        let mut request = Params::new();
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("marketSymbol".into(), market.id.clone().into());
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .request(
                "cancel_all_orders",
                Access::Private,
                Method::DELETE,
                "orders/open",
                request,
            )
            .await?;
        let rows: Vec<Value> = decode("cancel results", response)?;
        let results = rows
            .into_iter()
            .map(|row| row.get("result").cloned().unwrap_or_else(|| json!({})))
            .collect();
        self.parse_orders(Value::Array(results), market.as_ref()).await
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.config.credentials(ID, "fetch_order")?;
        let market = match symbol {
            Some(symbol) => Some(self.market(symbol).await?),
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .private_get("fetch_order", "orders/{orderId}", params(json!({ "orderId": id })))
            .await?;
        let index = self.index.read().await;
        parse::parse_order(&response, market.as_ref(), &index)
    }

    async fn fetch_open_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "fetch_open_orders")?;
        let mut request = Params::new();
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("marketSymbol".into(), market.id.clone().into());
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .private_get("fetch_open_orders", "orders/open", request)
            .await?;
        let orders = self.parse_orders(response, market.as_ref()).await?;
        Ok(filter_by_since_limit(orders, page.since, page.limit))
    }

    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.config.credentials(ID, "fetch_closed_orders")?;
        let mut request = Params::new();
        insert_opt(&mut request, "pageSize", page.limit);
        if let Some(since) = page.since {
            insert_opt(&mut request, "startDate", iso8601_seconds(since));
        }
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                // 여기만 통합 코드(base-quote)를 쓴다
                request.insert(
                    "marketSymbol".into(),
                    format!("{}-{}", market.base, market.quote).into(),
                );
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .private_get("fetch_closed_orders", "orders/closed", request)
            .await?;
        let orders = self.parse_orders(response, market.as_ref()).await?;
        if self.options.closed_orders_filter_by_since {
            Ok(filter_by_since_limit(orders, page.since, page.limit))
        } else {
            Ok(orders)
        }
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        page: Page,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.config.credentials(ID, "fetch_my_trades")?;
        let mut request = Params::new();
        insert_opt(&mut request, "pageSize", page.limit);
        if let Some(since) = page.since {
            insert_opt(&mut request, "startDate", iso8601_seconds(since));
        }
        let market = match symbol {
            Some(symbol) => {
                let market = self.market(symbol).await?;
                request.insert("marketSymbol".into(), market.id.clone().into());
                Some(market)
            }
            None => {
                self.load_markets(false).await?;
                None
            }
        };
        let response = self
            .private_get("fetch_my_trades", "executions", request)
            .await?;
        let rows: Vec<Value> = decode("executions", response)?;
        let trades = {
            let index = self.index.read().await;
            rows.iter()
                .map(|row| parse::parse_trade(row, market.as_ref(), &index))
                .collect::<Result<Vec<_>, _>>()?
        };
        let trades = match &market {
            Some(market) => trades
                .into_iter()
                .filter(|t| t.symbol.as_deref() == Some(market.symbol.as_str()))
                .collect(),
            None => trades,
        };
        Ok(filter_by_since_limit(trades, page.since, page.limit))
    }

    async fn fetch_deposits(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let status = self.options.deposit_status.clone();
        self.fetch_deposits_with_status(status, code, page).await
    }

    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        page: Page,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let status = self.options.withdrawal_status.clone();
        self.fetch_withdrawals_with_status(status, code, page).await
    }

    async fn fetch_deposit_address(
        &self,
        code: &str,
        _network: Option<&str>,
    ) -> Result<DepositAddress, ExchangeError> {
        self.config.credentials(ID, "fetch_deposit_address")?;
        let currency_id = self.currency_id(code, "fetch_deposit_address").await?;
        let response = self
            .private_get(
                "fetch_deposit_address",
                "addresses/{currencySymbol}",
                params(json!({ "currencySymbol": currency_id })),
            )
            .await?;
        deposit_address(code, response)
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.config.credentials(ID, "withdraw")?;
        request.validate(ID, "withdraw")?;
        let currency_id = self.currency_id(&request.code, "withdraw").await?;
        let mut body = params(json!({
            "currencySymbol": currency_id,
            "quantity": decimal_value(request.amount),
            "cryptoAddress": request.address,
        }));
        insert_opt(&mut body, "cryptoAddressTag", request.tag.clone());
        let response = self
            .request("withdraw", Access::Private, Method::POST, "withdrawals", body)
            .await?;
        let index = self.index.read().await;
        parse::parse_transaction(&response, &index)
    }
}
