use std::fmt;

use thiserror::Error;

use crate::model::ExchangeId;

/// 거래소 응답을 분류한 결과 (통합 에러 종류)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    PermissionDenied,
    AccountSuspended,
    InsufficientFunds,
    InvalidOrder,
    OrderNotFound,
    InvalidNonce,
    InvalidAddress,
    AddressPending,
    RateLimit,
    OnMaintenance,
    ExchangeNotAvailable,
    RequestTimeout,
    BadSymbol,
    BadRequest,
    ArgumentsRequired,
    NotSupported,
    /// 어떤 테이블에도 매칭되지 않은 일반 거래소 에러
    Exchange,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::AccountSuspended => "account suspended",
            ErrorKind::InsufficientFunds => "insufficient funds",
            ErrorKind::InvalidOrder => "invalid order",
            ErrorKind::OrderNotFound => "order not found",
            ErrorKind::InvalidNonce => "invalid nonce",
            ErrorKind::InvalidAddress => "invalid address",
            ErrorKind::AddressPending => "address pending",
            ErrorKind::RateLimit => "rate limit exceeded",
            ErrorKind::OnMaintenance => "on maintenance",
            ErrorKind::ExchangeNotAvailable => "exchange not available",
            ErrorKind::RequestTimeout => "request timeout",
            ErrorKind::BadSymbol => "bad symbol",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::ArgumentsRequired => "arguments required",
            ErrorKind::NotSupported => "not supported",
            ErrorKind::Exchange => "exchange error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{exchange} {method}: {kind}: {message}")]
    Exchange {
        kind: ErrorKind,
        exchange: ExchangeId,
        method: &'static str,
        message: String,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl ExchangeError {
    pub fn new(
        kind: ErrorKind,
        exchange: ExchangeId,
        method: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ExchangeError::Exchange {
            kind,
            exchange,
            method,
            message: message.into(),
        }
    }

    pub fn not_supported(exchange: ExchangeId, method: &'static str) -> Self {
        Self::new(
            ErrorKind::NotSupported,
            exchange,
            method,
            format!("{} {}() is not supported yet", exchange, method),
        )
    }

    pub fn arguments_required(exchange: ExchangeId, method: &'static str, what: &str) -> Self {
        Self::new(
            ErrorKind::ArgumentsRequired,
            exchange,
            method,
            format!("{}() requires {}", method, what),
        )
    }

    pub fn bad_request(
        exchange: ExchangeId,
        method: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::BadRequest, exchange, method, message)
    }

    pub fn invalid_order(
        exchange: ExchangeId,
        method: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidOrder, exchange, method, message)
    }

    pub fn decode(what: &'static str, source: serde_json::Error) -> Self {
        ExchangeError::Decode { what, source }
    }

    /// 분류된 거래소 에러면 그 종류, 전송/디코딩 에러면 None
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExchangeError::Exchange { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExchangeError::Exchange { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_display_carries_context() {
        let err = ExchangeError::new(
            ErrorKind::InsufficientFunds,
            ExchangeId::Bittrex,
            "create_order",
            "INSUFFICIENT_FUNDS",
        );
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientFunds));
        assert_eq!(err.message(), Some("INSUFFICIENT_FUNDS"));
        assert_eq!(
            err.to_string(),
            "bittrex create_order: insufficient funds: INSUFFICIENT_FUNDS"
        );
    }

    #[test]
    fn test_not_supported_kind() {
        let err = ExchangeError::not_supported(ExchangeId::BtcAlpha, "fetch_time");
        assert_eq!(err.kind(), Some(ErrorKind::NotSupported));
        assert!(err.to_string().contains("fetch_time"));
    }

    #[test]
    fn test_other_has_no_kind() {
        let err = ExchangeError::Other("boom".into());
        assert_eq!(err.kind(), None);
    }
}
