//! 거래소마다 숫자를 문자열로 주기도 하고 숫자로 주기도 해서,
//! 양쪽을 모두 받아들이는 serde 헬퍼 모음.
//! `#[serde(default, deserialize_with = "de::opt_decimal")]` 형태로 쓴다.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn value_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
        .map(|d| d.normalize())
}

pub fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn value_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_decimal))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_string))
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_i64))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_bool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "opt_decimal")]
        price: Option<Decimal>,
        #[serde(default, deserialize_with = "opt_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "opt_i64")]
        ts: Option<i64>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
    }

    #[test]
    fn test_string_or_number() {
        let a: Row = serde_json::from_value(json!({"price": "100.50", "id": 7, "ts": "1700000000000"}))
            .unwrap();
        let b: Row =
            serde_json::from_value(json!({"price": 100.5, "id": "7", "ts": 1700000000000i64}))
                .unwrap();
        assert_eq!(a.price, Some(dec!(100.5)));
        assert_eq!(a.price, b.price);
        assert_eq!(a.id.as_deref(), Some("7"));
        assert_eq!(a.id, b.id);
        assert_eq!(a.ts, b.ts);
    }

    #[test]
    fn test_missing_empty_null() {
        let row: Row =
            serde_json::from_value(json!({"price": "", "id": null, "flag": "false"})).unwrap();
        assert_eq!(row.price, None);
        assert_eq!(row.id, None);
        assert_eq!(row.ts, None);
        assert_eq!(row.flag, Some(false));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_decimal("1e-7"), Some(dec!(0.0000001)));
        assert_eq!(value_decimal(&json!(0.1)), Some(dec!(0.1)));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_value_i64_from_float_string() {
        assert_eq!(value_i64(&json!("1674658.445272")), Some(1674658));
        assert_eq!(value_bool(&json!(1)), Some(true));
    }
}
