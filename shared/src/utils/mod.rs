//! Utility functions and helpers

use anyhow::Result;
use std::time::Duration;

/// Parse a duration string (e.g., "250ms", "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str.parse()?;
        Ok(Duration::from_millis(millis))
    } else if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str.parse()?;
        Ok(Duration::from_secs(secs))
    } else if let Some(num_str) = s.strip_suffix('m') {
        scaled_secs(num_str, 60, s)
    } else if let Some(num_str) = s.strip_suffix('h') {
        scaled_secs(num_str, 3600, s)
    } else {
        // Default to seconds if no suffix
        let secs: u64 = s.parse()?;
        Ok(Duration::from_secs(secs))
    }
}

fn scaled_secs(num_str: &str, unit: u64, original: &str) -> Result<Duration> {
    let count: u64 = num_str.parse()?;
    let secs = count
        .checked_mul(unit)
        .ok_or_else(|| anyhow::anyhow!("Duration out of range: {}", original))?;
    Ok(Duration::from_secs(secs))
}

/// Parse a `key=value` pair. The value is read as JSON when it parses,
/// otherwise it is kept as a plain string.
pub fn parse_key_value(s: &str) -> Result<(String, serde_json::Value)> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid key=value pair: {}", s))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Empty key in pair: {}", s);
    }
    Ok((key.to_string(), parse_value(raw)))
}

/// Read a command-line value as JSON, falling back to a string
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
        assert_eq!(parse_duration("5m").unwrap().as_secs(), 300);
        assert_eq!(parse_duration("1h").unwrap().as_secs(), 3600);
        assert_eq!(parse_duration("60").unwrap().as_secs(), 60);
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(parse_duration("9999999999999999h").is_err());
        assert!(parse_duration("999999999999999999m").is_err());
        assert_eq!(
            parse_duration("5124095576030431h").unwrap().as_secs(),
            5124095576030431 * 3600
        );
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("ms=50").unwrap(), ("ms".to_string(), json!(50)));
        assert_eq!(
            parse_key_value("dtype=fp16").unwrap(),
            ("dtype".to_string(), json!("fp16"))
        );
        assert_eq!(
            parse_key_value("shape=[2,3]").unwrap(),
            ("shape".to_string(), json!([2, 3]))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=1").is_err());
    }
}
