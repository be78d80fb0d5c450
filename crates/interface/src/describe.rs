use rust_decimal::Decimal;

use crate::{
    classify::{BroadRule, ErrorTable},
    error::ErrorKind,
    model::ExchangeId,
    timeframe::Timeframe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Private,
}

/// 엔드포인트 한 개. weight 는 rate limit 참고용 메타데이터이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub access: Access,
    pub method: &'static str,
    pub path: &'static str,
    pub weight: u32,
}

impl Endpoint {
    pub const fn public(method: &'static str, path: &'static str, weight: u32) -> Self {
        Self {
            access: Access::Public,
            method,
            path,
            weight,
        }
    }

    pub const fn private(method: &'static str, path: &'static str, weight: u32) -> Self {
        Self {
            access: Access::Private,
            method,
            path,
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FetchMarkets,
    FetchCurrencies,
    FetchTicker,
    FetchTickers,
    FetchBidsAsks,
    FetchOrderBook,
    FetchTrades,
    FetchOhlcv,
    FetchTime,
    FetchStatus,
    FetchTradingFee,
    FetchTradingFees,
    FetchBalance,
    CreateOrder,
    CancelOrder,
    CancelOrders,
    CancelAllOrders,
    FetchOrder,
    FetchOrders,
    FetchOpenOrders,
    FetchClosedOrders,
    FetchMyTrades,
    FetchOrderTrades,
    FetchDeposit,
    FetchDeposits,
    FetchWithdrawal,
    FetchWithdrawals,
    FetchTransactions,
    FetchDepositAddress,
    CreateDepositAddress,
    Withdraw,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FetchMarkets => "fetchMarkets",
            Capability::FetchCurrencies => "fetchCurrencies",
            Capability::FetchTicker => "fetchTicker",
            Capability::FetchTickers => "fetchTickers",
            Capability::FetchBidsAsks => "fetchBidsAsks",
            Capability::FetchOrderBook => "fetchOrderBook",
            Capability::FetchTrades => "fetchTrades",
            Capability::FetchOhlcv => "fetchOHLCV",
            Capability::FetchTime => "fetchTime",
            Capability::FetchStatus => "fetchStatus",
            Capability::FetchTradingFee => "fetchTradingFee",
            Capability::FetchTradingFees => "fetchTradingFees",
            Capability::FetchBalance => "fetchBalance",
            Capability::CreateOrder => "createOrder",
            Capability::CancelOrder => "cancelOrder",
            Capability::CancelOrders => "cancelOrders",
            Capability::CancelAllOrders => "cancelAllOrders",
            Capability::FetchOrder => "fetchOrder",
            Capability::FetchOrders => "fetchOrders",
            Capability::FetchOpenOrders => "fetchOpenOrders",
            Capability::FetchClosedOrders => "fetchClosedOrders",
            Capability::FetchMyTrades => "fetchMyTrades",
            Capability::FetchOrderTrades => "fetchOrderTrades",
            Capability::FetchDeposit => "fetchDeposit",
            Capability::FetchDeposits => "fetchDeposits",
            Capability::FetchWithdrawal => "fetchWithdrawal",
            Capability::FetchWithdrawals => "fetchWithdrawals",
            Capability::FetchTransactions => "fetchTransactions",
            Capability::FetchDepositAddress => "fetchDepositAddress",
            Capability::CreateDepositAddress => "createDepositAddress",
            Capability::Withdraw => "withdraw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingFeeSchedule {
    pub maker: Decimal,
    pub taker: Decimal,
    pub percentage: bool,
    pub tier_based: bool,
}

/// 어댑터별 정적 능력표
#[derive(Debug)]
pub struct Description {
    pub id: ExchangeId,
    pub name: &'static str,
    pub countries: &'static [&'static str],
    pub version: &'static str,
    /// 요청 사이 권장 간격 (ms)
    pub rate_limit: u64,
    pub hosts: &'static [(&'static str, &'static str)],
    pub timeframes: &'static [(Timeframe, &'static str)],
    pub fees: TradingFeeSchedule,
    pub has: &'static [Capability],
    pub endpoints: &'static [Endpoint],
    pub exact: &'static [(&'static str, ErrorKind)],
    pub broad: &'static [BroadRule],
    pub common_currencies: &'static [(&'static str, &'static str)],
}

impl Description {
    pub fn has(&self, capability: Capability) -> bool {
        self.has.contains(&capability)
    }

    pub fn host(&self, name: &str) -> Option<&'static str> {
        self.hosts
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, url)| *url)
    }

    /// 통합 주기 -> 거래소 표기
    pub fn timeframe(&self, timeframe: Timeframe) -> Option<&'static str> {
        self.timeframes
            .iter()
            .find(|(tf, _)| *tf == timeframe)
            .map(|(_, native)| *native)
    }

    pub fn endpoint(&self, access: Access, method: &str, path: &str) -> Option<&'static Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.access == access && e.method == method && e.path == path)
    }

    /// 문서화되지 않은 엔드포인트는 weight 1 로 본다
    pub fn weight(&self, access: Access, method: &str, path: &str) -> u32 {
        self.endpoint(access, method, path)
            .map(|e| e.weight)
            .unwrap_or(1)
    }

    pub fn error_table(&self) -> ErrorTable {
        ErrorTable::new(self.exact, self.broad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    static SAMPLE: Description = Description {
        id: ExchangeId::Bittrex,
        name: "Sample",
        countries: &["US"],
        version: "v1",
        rate_limit: 1000,
        hosts: &[("public", "https://example.com/api")],
        timeframes: &[(Timeframe::M1, "MINUTE_1"), (Timeframe::D1, "DAY_1")],
        fees: TradingFeeSchedule {
            maker: dec!(0.001),
            taker: dec!(0.002),
            percentage: true,
            tier_based: false,
        },
        has: &[Capability::FetchMarkets, Capability::FetchTicker],
        endpoints: &[Endpoint::public("GET", "markets", 1), Endpoint::private("POST", "orders", 5)],
        exact: &[("APIKEY_INVALID", ErrorKind::Authentication)],
        broad: &[BroadRule::new("Out of balance", ErrorKind::InsufficientFunds)],
        common_currencies: &[],
    };

    #[test]
    fn test_lookup_helpers() {
        assert!(SAMPLE.has(Capability::FetchTicker));
        assert!(!SAMPLE.has(Capability::Withdraw));
        assert_eq!(SAMPLE.timeframe(Timeframe::D1), Some("DAY_1"));
        assert_eq!(SAMPLE.timeframe(Timeframe::H1), None);
        assert_eq!(SAMPLE.host("public"), Some("https://example.com/api"));
        assert_eq!(SAMPLE.weight(Access::Private, "POST", "orders"), 5);
        assert_eq!(SAMPLE.weight(Access::Public, "GET", "unknown"), 1);
    }

    #[test]
    fn test_error_table_from_description() {
        let table = SAMPLE.error_table();
        assert_eq!(table.classify("APIKEY_INVALID"), Some(ErrorKind::Authentication));
        assert_eq!(
            table.classify("Out of balance: need 3"),
            Some(ErrorKind::InsufficientFunds)
        );
    }
}
