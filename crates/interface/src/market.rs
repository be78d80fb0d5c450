use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ErrorKind, ExchangeError},
    model::ExchangeId,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MinMax {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl MinMax {
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self { min, max }
    }
}

/// tick size (예: 0.01) 로 표현한 정밀도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarketPrecision {
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarketLimits {
    pub amount: MinMax,
    pub price: MinMax,
    pub cost: MinMax,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    /// 통합 심볼 "BASE/QUOTE"
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub base_id: String,
    pub quote_id: String,
    pub active: Option<bool>,
    pub precision: MarketPrecision,
    pub limits: MarketLimits,
    pub maker: Option<Decimal>,
    pub taker: Option<Decimal>,
    pub info: Value,
}

impl Market {
    /// 인덱스에 없는 마켓 id 를 위한 최소 마켓
    pub fn stub(id: &str, base: &str, quote: &str) -> Self {
        Market {
            id: id.to_string(),
            symbol: format!("{}/{}", base, quote),
            base: base.to_string(),
            quote: quote.to_string(),
            base_id: base.to_string(),
            quote_id: quote.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CurrencyLimits {
    pub amount: MinMax,
    pub withdraw: MinMax,
    pub deposit: MinMax,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrencyNetwork {
    pub id: String,
    pub network: String,
    pub active: Option<bool>,
    pub deposit: Option<bool>,
    pub withdraw: Option<bool>,
    pub fee: Option<Decimal>,
    pub precision: Option<Decimal>,
    pub limits: CurrencyLimits,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub id: String,
    pub code: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub currency_type: Option<String>,
    pub active: Option<bool>,
    pub deposit: Option<bool>,
    pub withdraw: Option<bool>,
    pub fee: Option<Decimal>,
    pub precision: Option<Decimal>,
    pub limits: CurrencyLimits,
    pub networks: BTreeMap<String, CurrencyNetwork>,
    pub info: Value,
}

/// 10^-digits. 소수점 자릿수를 tick size 로 바꾼다.
pub fn parse_precision(digits: i64) -> Option<Decimal> {
    if !(0..=28).contains(&digits) {
        return None;
    }
    Some(Decimal::new(1, digits as u32))
}

const COMMON_CURRENCIES: &[(&str, &str)] = &[
    ("XBT", "BTC"),
    ("BCC", "BCH"),
    ("BCHABC", "BCH"),
    ("BCHSV", "BSV"),
    ("DRK", "DASH"),
];

/// load_markets 가 채우는 마켓/통화 인덱스.
/// 로드 전에는 비어 있고, 파서는 safe_* 조회로 없는 id 도 처리한다.
#[derive(Debug, Clone)]
pub struct MarketIndex {
    exchange: ExchangeId,
    markets: BTreeMap<String, Market>,
    markets_by_id: HashMap<String, String>,
    currencies: BTreeMap<String, Currency>,
    currencies_by_id: HashMap<String, String>,
    common_currencies: HashMap<String, String>,
    loaded: bool,
}

impl MarketIndex {
    pub fn new(exchange: ExchangeId, extra_common: &[(&str, &str)]) -> Self {
        let common_currencies = COMMON_CURRENCIES
            .iter()
            .chain(extra_common.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            exchange,
            markets: BTreeMap::new(),
            markets_by_id: HashMap::new(),
            currencies: BTreeMap::new(),
            currencies_by_id: HashMap::new(),
            common_currencies,
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_markets(&mut self, markets: Vec<Market>) {
        self.markets.clear();
        self.markets_by_id.clear();
        for market in markets {
            self.markets_by_id
                .insert(market.id.clone(), market.symbol.clone());
            self.markets.insert(market.symbol.clone(), market);
        }
        self.loaded = true;
    }

    pub fn set_currencies(&mut self, currencies: impl IntoIterator<Item = Currency>) {
        self.currencies.clear();
        self.currencies_by_id.clear();
        for currency in currencies {
            self.currencies_by_id
                .insert(currency.id.clone(), currency.code.clone());
            self.currencies.insert(currency.code.clone(), currency);
        }
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.markets.keys().cloned().collect()
    }

    pub fn market(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn market_by_id(&self, id: &str) -> Option<&Market> {
        self.markets_by_id
            .get(id)
            .and_then(|symbol| self.markets.get(symbol))
    }

    pub fn currencies(&self) -> &BTreeMap<String, Currency> {
        &self.currencies
    }

    pub fn currency(&self, code: &str) -> Option<&Currency> {
        self.currencies.get(code)
    }

    pub fn currency_by_id(&self, id: &str) -> Option<&Currency> {
        self.currencies_by_id
            .get(id)
            .and_then(|code| self.currencies.get(code))
    }

    /// 거래소 고유 통화 id -> 통합 코드
    pub fn common_currency_code(&self, code: &str) -> String {
        self.common_currencies
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// 인덱스에 있으면 그 코드, 없으면 대문자 + 별칭 변환
    pub fn safe_currency_code(&self, id: &str) -> String {
        if let Some(currency) = self.currency_by_id(id) {
            return currency.code.clone();
        }
        self.common_currency_code(&id.to_uppercase())
    }

    /// id 로 찾고, 없으면 구분자로 잘라 임시 마켓을 만든다.
    /// 그것도 안 되면 호출자가 넘긴 마켓, 마지막으로 id 자체를 심볼로 쓴다.
    pub fn safe_market(&self, id: &str, hint: Option<&Market>, delimiter: Option<&str>) -> Market {
        if let Some(market) = self.market_by_id(id) {
            return market.clone();
        }
        if let Some(delimiter) = delimiter {
            let parts: Vec<&str> = id.split(delimiter).collect();
            if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                let base = self.safe_currency_code(parts[0]);
                let quote = self.safe_currency_code(parts[1]);
                let mut market = Market::stub(id, &base, &quote);
                market.base_id = parts[0].to_string();
                market.quote_id = parts[1].to_string();
                return market;
            }
        }
        if let Some(hint) = hint {
            return hint.clone();
        }
        Market {
            id: id.to_string(),
            symbol: id.to_string(),
            ..Default::default()
        }
    }

    pub fn safe_symbol(&self, id: &str, hint: Option<&Market>, delimiter: Option<&str>) -> String {
        self.safe_market(id, hint, delimiter).symbol
    }

    pub fn market_or_err(&self, symbol: &str, method: &'static str) -> Result<&Market, ExchangeError> {
        self.market(symbol).ok_or_else(|| {
            ExchangeError::new(
                ErrorKind::BadSymbol,
                self.exchange,
                method,
                format!("{} does not have market symbol {}", self.exchange, symbol),
            )
        })
    }

    pub fn currency_or_err(
        &self,
        code: &str,
        method: &'static str,
    ) -> Result<&Currency, ExchangeError> {
        self.currency(code).ok_or_else(|| {
            ExchangeError::new(
                ErrorKind::BadRequest,
                self.exchange,
                method,
                format!("{} does not have currency code {}", self.exchange, code),
            )
        })
    }

    /// 통화 목록이 없는 어댑터용: 인덱스에 없으면 코드 자체를 id 로 쓴다
    pub fn currency_id(&self, code: &str) -> String {
        self.currency(code)
            .map(|c| c.id.clone())
            .unwrap_or_else(|| code.to_string())
    }
}
