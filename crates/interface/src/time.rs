use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

pub fn milliseconds() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn seconds() -> i64 {
    Utc::now().timestamp()
}

/// epoch ms -> `2024-01-01T00:00:00.000Z`
pub fn iso8601(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// 밀리초 없는 `2024-01-01T00:00:00Z`
pub fn iso8601_seconds(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

pub fn datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// ISO8601 문자열 -> epoch ms. 타임존이 없는 값은 UTC 로 본다.
pub fn parse8601(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601_round_trip() {
        let ms = 1_700_000_000_123;
        let s = iso8601(ms).unwrap();
        assert_eq!(s, "2023-11-14T22:13:20.123Z");
        assert_eq!(parse8601(&s), Some(ms));
        assert_eq!(iso8601_seconds(ms).unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_parse8601_variants() {
        assert_eq!(parse8601("2023-11-14T22:13:20Z"), Some(1_700_000_000_000));
        assert_eq!(
            parse8601("2023-11-14T22:13:20.5"),
            Some(1_700_000_000_500)
        );
        assert_eq!(parse8601(""), None);
        assert_eq!(parse8601("yesterday"), None);
    }
}
