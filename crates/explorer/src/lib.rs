pub mod explore;
pub mod logger;

use std::sync::Once;

use exchanges::PrivateExchange;
use interface::{ExchangeConfig, ExchangeError, ExchangeId};

static INIT: Once = Once::new();

/// .env 를 한 번만 읽는다
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

#[ctor::ctor]
fn setup() {
    init();
}

/// `{ID}_API_KEY` / `{ID}_API_SECRET` 가 있으면 키를 실은 클라이언트를 만든다.
/// 키가 없어도 공개 API 는 그대로 쓸 수 있다.
pub fn client(id: ExchangeId) -> Result<Box<dyn PrivateExchange>, ExchangeError> {
    let config = ExchangeConfig::from_env(id.as_str());
    exchanges::build(id, config)
}
