//! Permissive deserializers for metadata produced by the downloading tool.
//!
//! The tool reports durations as floats, omits counts for live streams and
//! emits `null` for unknown uploaders. These helpers collapse all of that into
//! plain non-negative integers and strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize any JSON number (or `null`) into a non-negative `u64`.
///
/// Negative, non-finite and non-numeric values become 0.
pub fn non_negative_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, value_to_u64))
}

/// Deserialize a string that may be `null` into an owned `String`.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn value_to_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f > 0.0)
                .map_or(0, |f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<f64>().map_or(0, |f| {
            if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
        }),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "non_negative_u64")]
        n: u64,
        #[serde(default, deserialize_with = "string_or_empty")]
        s: String,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_float_duration_truncates() {
        assert_eq!(probe(r#"{"n": 212.7}"#).n, 212);
    }

    #[test]
    fn test_null_and_negative_become_zero() {
        assert_eq!(probe(r#"{"n": null}"#).n, 0);
        assert_eq!(probe(r#"{"n": -5}"#).n, 0);
        assert_eq!(probe(r"{}").n, 0);
    }

    #[test]
    fn test_string_or_empty_handles_null() {
        assert_eq!(probe(r#"{"s": null}"#).s, "");
        assert_eq!(probe(r#"{"s": "Rick"}"#).s, "Rick");
    }
}
