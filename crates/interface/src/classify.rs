use std::collections::HashMap;

use crate::error::ErrorKind;

/// 부분 문자열 매칭 규칙. 선언 순서대로 평가되고 처음 매칭된 규칙이 이긴다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadRule {
    pub needle: &'static str,
    pub kind: ErrorKind,
}

impl BroadRule {
    pub const fn new(needle: &'static str, kind: ErrorKind) -> Self {
        Self { needle, kind }
    }

    pub fn matches(&self, text: &str) -> bool {
        text.contains(self.needle)
    }
}

/// exact / broad 두 단계 에러 테이블
#[derive(Debug, Clone)]
pub struct ErrorTable {
    exact: HashMap<&'static str, ErrorKind>,
    broad: Vec<BroadRule>,
}

impl ErrorTable {
    pub fn new(exact: &[(&'static str, ErrorKind)], broad: &[BroadRule]) -> Self {
        Self {
            exact: exact.iter().copied().collect(),
            broad: broad.to_vec(),
        }
    }

    pub fn exact(&self, code: &str) -> Option<ErrorKind> {
        self.exact.get(code).copied()
    }

    pub fn broad(&self, text: &str) -> Option<ErrorKind> {
        self.broad
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.kind)
    }

    /// exact 먼저, 그 다음 broad
    pub fn classify(&self, text: &str) -> Option<ErrorKind> {
        self.exact(text).or_else(|| self.broad(text))
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.broad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 어댑터 분류기가 통과시킨 응답에 적용하는 기본 HTTP 상태 매핑
pub fn http_status_kind(status: u16) -> Option<ErrorKind> {
    match status {
        401 | 407 | 511 => Some(ErrorKind::Authentication),
        418 | 429 => Some(ErrorKind::RateLimit),
        408 | 504 => Some(ErrorKind::RequestTimeout),
        422 => Some(ErrorKind::Exchange),
        400 | 403 | 404 | 405 | 409 | 410 | 451 => Some(ErrorKind::ExchangeNotAvailable),
        500..=599 => Some(ErrorKind::ExchangeNotAvailable),
        s if s >= 400 => Some(ErrorKind::Exchange),
        _ => None,
    }
}
