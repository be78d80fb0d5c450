//! 모든 어댑터가 공유하는 요청 파이프라인:
//! sign -> 전송 -> 거래소별 에러 분류 -> 기본 HTTP 상태 검사 -> JSON

use reqwest::{header::HeaderMap, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use interface::{
    http_status_kind, time::milliseconds, Access, Description, ErrorKind, ErrorTable,
    ExchangeError, ExchangeId, Params,
};

/// sign() 결과. 전송 직전 요청 그대로.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl SignedRequest {
    pub fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 분류기에 넘기는 원본 응답
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub url: String,
    pub headers: HeaderMap,
    pub body: String,
    pub json: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub(crate) trait RestAdapter: Send + Sync {
    /// 엔드포인트 그룹 (public/private, API 버전 등)
    type Api: Copy + Send + Sync + std::fmt::Debug;

    fn exchange_id(&self) -> ExchangeId;

    fn description(&self) -> &'static Description;

    fn http(&self) -> &reqwest::Client;

    fn access(api: Self::Api) -> Access;

    fn sign(
        &self,
        method_name: &'static str,
        api: Self::Api,
        verb: Method,
        path: &str,
        params: Params,
        nonce: i64,
    ) -> Result<SignedRequest, ExchangeError>;

    /// 거래소 고유 에러 포맷 검사. 통과하면 기본 HTTP 상태 검사로 넘어간다.
    fn handle_errors(
        &self,
        method_name: &'static str,
        response: &RawResponse,
    ) -> Result<(), ExchangeError>;

    fn nonce(&self) -> i64 {
        milliseconds()
    }
}

pub(crate) async fn fetch<A: RestAdapter>(
    adapter: &A,
    method_name: &'static str,
    api: A::Api,
    verb: Method,
    path: &str,
    params: Params,
) -> Result<Value, ExchangeError> {
    let (json, _) = fetch_with_headers(adapter, method_name, api, verb, path, params).await?;
    Ok(json)
}

/// 응답 헤더가 필요한 경우 (예: 호가 sequence)
pub(crate) async fn fetch_with_headers<A: RestAdapter>(
    adapter: &A,
    method_name: &'static str,
    api: A::Api,
    verb: Method,
    path: &str,
    params: Params,
) -> Result<(Value, HeaderMap), ExchangeError> {
    let nonce = adapter.nonce();
    let request = adapter.sign(method_name, api, verb, path, params, nonce)?;
    let weight = adapter
        .description()
        .weight(A::access(api), request.method.as_str(), path);
    debug!(
        exchange = %adapter.exchange_id(),
        method = method_name,
        weight,
        "{} {}",
        request.method,
        request.url
    );

    let response = execute(adapter.http(), request).await?;

    if let Err(e) = adapter.handle_errors(method_name, &response) {
        warn!(exchange = %adapter.exchange_id(), method = method_name, "{}", e);
        return Err(e);
    }
    check_status(adapter.exchange_id(), method_name, &response)?;

    let json = match response.json {
        Some(json) => json,
        None if response.body.trim().is_empty() => Value::Null,
        None => serde_json::from_str(&response.body)
            .map_err(|e| ExchangeError::decode(method_name, e))?,
    };
    Ok((json, response.headers))
}

async fn execute(
    http: &reqwest::Client,
    request: SignedRequest,
) -> Result<RawResponse, ExchangeError> {
    let mut builder = http.request(request.method, &request.url);
    for (name, value) in request.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let headers = response.headers().clone();
    let body = response.text().await?;
    let json = serde_json::from_str(&body).ok();
    Ok(RawResponse {
        status,
        url,
        headers,
        body,
        json,
    })
}

/// 어댑터 분류기가 통과시킨 응답의 HTTP 상태 검사
pub(crate) fn check_status(
    exchange: ExchangeId,
    method_name: &'static str,
    response: &RawResponse,
) -> Result<(), ExchangeError> {
    match http_status_kind(response.status) {
        Some(kind) => Err(ExchangeError::new(
            kind,
            exchange,
            method_name,
            format!("{} {}", response.status, response.body),
        )),
        None => Ok(()),
    }
}

/// 한 응답에 대한 exact/broad 테이블 조회.
/// 매칭되면 Err 로 바로 돌려주고, 메시지는 응답 본문 그대로 담는다.
pub(crate) struct Classifier<'a> {
    table: &'a ErrorTable,
    exchange: ExchangeId,
    method: &'static str,
    feedback: &'a str,
}

impl<'a> Classifier<'a> {
    pub fn new(
        table: &'a ErrorTable,
        exchange: ExchangeId,
        method: &'static str,
        feedback: &'a str,
    ) -> Self {
        Self {
            table,
            exchange,
            method,
            feedback,
        }
    }

    pub fn exact(&self, key: &str) -> Result<(), ExchangeError> {
        match self.table.exact(key) {
            Some(kind) => Err(self.error(kind)),
            None => Ok(()),
        }
    }

    pub fn broad(&self, text: &str) -> Result<(), ExchangeError> {
        match self.table.broad(text) {
            Some(kind) => Err(self.error(kind)),
            None => Ok(()),
        }
    }

    pub fn error(&self, kind: ErrorKind) -> ExchangeError {
        ExchangeError::new(kind, self.exchange, self.method, self.feedback)
    }

    /// 어느 테이블에도 없는 에러
    pub fn generic(&self) -> ExchangeError {
        self.error(ErrorKind::Exchange)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| ExchangeError::decode(what, e))
}

/// `json!({...})` 리터럴을 Params 로
pub(crate) fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// 값이 있을 때만 넣는다
pub(crate) fn insert_opt<T: Into<Value>>(params: &mut Params, key: &str, value: Option<T>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.into());
    }
}

/// 거래소가 문자열 숫자를 받는 경우
pub(crate) fn decimal_value(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

#[cfg(test)]
pub(crate) fn raw_response(status: u16, url: &str, body: &str) -> RawResponse {
    RawResponse {
        status,
        url: url.to_string(),
        headers: HeaderMap::new(),
        body: body.to_string(),
        json: serde_json::from_str(body).ok(),
    }
}
