use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{error::ExchangeError, request::Params};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

pub fn hmac_sha256_hex(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Other(format!("Failed to create HMAC signer: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn hmac_sha384_hex(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha384::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Other(format!("Failed to create HMAC signer: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn hmac_sha512_hex(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Other(format!("Failed to create HMAC signer: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn sha512_hex(payload: &str) -> String {
    hex::encode(Sha512::digest(payload.as_bytes()))
}

pub fn base64_encode(payload: &str) -> String {
    BASE64.encode(payload.as_bytes())
}

fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `a=1&b=x%20y` 형태. 키는 정렬된 순서로 나온다.
pub fn urlencode(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k),
                urlencoding::encode(&param_string(v))
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `orders/{pair}/{id}` 의 자리표시자를 params 값으로 채우고, 쓰인 키는 뺀 나머지를 돌려준다
pub fn implode_path(path: &str, params: &Params) -> Result<(String, Params), ExchangeError> {
    let mut out = String::with_capacity(path.len());
    let mut rest = params.clone();
    let mut remaining = path;
    while let Some(start) = remaining.find('{') {
        out.push_str(&remaining[..start]);
        let after = &remaining[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| ExchangeError::Other(format!("unterminated path parameter in {}", path)))?;
        let key = &after[..end];
        let value = rest
            .remove(key)
            .ok_or_else(|| ExchangeError::Other(format!("missing path parameter {} for {}", key, path)))?;
        out.push_str(&param_string(&value));
        remaining = &after[end + 1..];
    }
    out.push_str(remaining);
    Ok((out, rest))
}

/// 경로 없이 쿼리만 붙일 때
pub fn append_query(url: &str, params: &Params) -> String {
    if params.is_empty() {
        url.to_string()
    } else {
        format!("{}?{}", url, urlencode(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Params {
        match v {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let sig = hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_signatures_deterministic() {
        let a = hmac_sha512_hex("secret", "1700000000000GET/v2/auth/account").unwrap();
        let b = hmac_sha512_hex("secret", "1700000000000GET/v2/auth/account").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert_eq!(hmac_sha384_hex("secret", "x").unwrap().len(), 96);
        assert_ne!(a, hmac_sha512_hex("other", "1700000000000GET/v2/auth/account").unwrap());
    }

    #[test]
    fn test_sha512_empty() {
        assert!(sha512_hex("").starts_with("cf83e1357eefb8bd"));
    }

    #[test]
    fn test_urlencode_sorted() {
        let p = params(json!({"pair": "ETH_BTC", "amount": 1.5, "type": "buy now"}));
        assert_eq!(urlencode(&p), "amount=1.5&pair=ETH_BTC&type=buy%20now");
    }

    #[test]
    fn test_implode_path() {
        let p = params(json!({"pair": "btc_twd", "id": 42, "limit": 10}));
        let (path, rest) = implode_path("orders/{pair}/{id}", &p).unwrap();
        assert_eq!(path, "orders/btc_twd/42");
        assert_eq!(rest.len(), 1);
        assert!(rest.contains_key("limit"));
        assert!(implode_path("orders/{pair}", &Params::new()).is_err());
        assert_eq!(append_query("https://x/y", &rest), "https://x/y?limit=10");
    }
}
