use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    error::{ErrorKind, ExchangeError},
    model::{ExchangeId, OrderType, Side, TimeInForce},
};

/// 거래소에 보내는 쿼리/바디 파라미터. 키 순서는 정렬된 상태로 유지된다.
pub type Params = serde_json::Map<String, Value>;

/// since(ms) / limit 페이지 조건
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub since: Option<i64>,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 트리거 가격에 도달하는 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub post_only: bool,
    pub client_order_id: Option<String>,
    pub trigger_price: Option<Decimal>,
    pub trigger_direction: Option<TriggerDirection>,
    pub trailing_percent: Option<Decimal>,
    /// 총액 기준 주문 (시장가 매수 등)
    pub cost: Option<Decimal>,
}

impl CreateOrderRequest {
    pub fn new(symbol: impl Into<String>, order_type: OrderType, side: Side, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type,
            side,
            amount,
            price: None,
            time_in_force: None,
            post_only: false,
            client_order_id: None,
            trigger_price: None,
            trigger_direction: None,
            trailing_percent: None,
            cost: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: Side, amount: Decimal, price: Decimal) -> Self {
        Self::new(symbol, OrderType::Limit, side, amount).with_price(price)
    }

    pub fn market(symbol: impl Into<String>, side: Side, amount: Decimal) -> Self {
        Self::new(symbol, OrderType::Market, side, amount)
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    pub fn with_post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    pub fn with_trigger(mut self, price: Decimal, direction: TriggerDirection) -> Self {
        self.trigger_price = Some(price);
        self.trigger_direction = Some(direction);
        self
    }

    pub fn with_trailing_percent(mut self, percent: Decimal) -> Self {
        self.trailing_percent = Some(percent);
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    /// 네트워크 요청 전에 공통 인자 검사
    pub fn validate(&self, exchange: ExchangeId, method: &'static str) -> Result<(), ExchangeError> {
        if self.symbol.is_empty() {
            return Err(ExchangeError::arguments_required(exchange, method, "a symbol"));
        }
        if self.amount <= Decimal::ZERO && self.cost.is_none() {
            return Err(ExchangeError::new(
                ErrorKind::InvalidOrder,
                exchange,
                method,
                format!("amount must be positive, got {}", self.amount),
            ));
        }
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(ExchangeError::arguments_required(
                exchange,
                method,
                "a price argument for limit orders",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub code: String,
    pub amount: Decimal,
    pub address: String,
    pub tag: Option<String>,
    pub network: Option<String>,
}

impl WithdrawRequest {
    pub fn new(code: impl Into<String>, amount: Decimal, address: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            amount,
            address: address.into(),
            tag: None,
            network: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn validate(&self, exchange: ExchangeId, method: &'static str) -> Result<(), ExchangeError> {
        if self.address.len() < 2 {
            return Err(ExchangeError::new(
                ErrorKind::InvalidAddress,
                exchange,
                method,
                format!("address is invalid or has less than 2 characters: {:?}", self.address),
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ExchangeError::bad_request(
                exchange,
                method,
                format!("withdraw amount must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}
