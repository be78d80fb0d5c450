use std::{env, fmt, time::Duration};

use crate::{
    error::{ErrorKind, ExchangeError},
    model::ExchangeId,
};

/// 어댑터 생성 시 넘기는 설정. 생성 이후에는 바뀌지 않는다.
#[derive(Clone, Default)]
pub struct ExchangeConfig {
    pub api_key: Option<String>,
    pub secret: Option<String>,
    pub timeout: Option<Duration>,
    pub base_url: Option<String>,
}

impl ExchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// 환경변수 `{PREFIX}_API_KEY`, `{PREFIX}_API_SECRET` 에서 키를 읽는다.
    /// 없는 값은 None 으로 남긴다.
    pub fn from_env(prefix: &str) -> Self {
        let prefix = prefix.to_uppercase();
        Self {
            api_key: env::var(format!("{prefix}_API_KEY")).ok(),
            secret: env::var(format!("{prefix}_API_SECRET")).ok(),
            timeout: None,
            base_url: None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.secret.is_some()
    }

    /// private 엔드포인트 서명 전에 호출
    pub fn credentials(
        &self,
        exchange: ExchangeId,
        method: &'static str,
    ) -> Result<(&str, &str), ExchangeError> {
        match (self.api_key.as_deref(), self.secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Ok((key, secret))
            }
            (None, _) | (Some(""), _) => Err(ExchangeError::new(
                ErrorKind::Authentication,
                exchange,
                method,
                format!("{} requires \"apiKey\" credential", exchange),
            )),
            _ => Err(ExchangeError::new(
                ErrorKind::Authentication,
                exchange,
                method,
                format!("{} requires \"secret\" credential", exchange),
            )),
        }
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ExchangeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("api_key", &self.api_key)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_missing_is_authentication() {
        let config = ExchangeConfig::new();
        let err = config
            .credentials(ExchangeId::Bitopro, "fetch_balance")
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));

        let config = ExchangeConfig::new().with_api_key("key");
        let err = config
            .credentials(ExchangeId::Bitopro, "fetch_balance")
            .unwrap_err();
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_credentials_present() {
        let config = ExchangeConfig::new().with_api_key("key").with_secret("s");
        let (key, secret) = config
            .credentials(ExchangeId::Whitebit, "fetch_balance")
            .unwrap();
        assert_eq!(key, "key");
        assert_eq!(secret, "s");
        assert!(config.has_credentials());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ExchangeConfig::new().with_api_key("key").with_secret("hidden");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hidden"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_from_env_reads_prefixed_vars() {
        env::set_var("CFGTEST_API_KEY", "k");
        env::set_var("CFGTEST_API_SECRET", "s");
        let config = ExchangeConfig::from_env("cfgtest");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.secret.as_deref(), Some("s"));
    }
}
