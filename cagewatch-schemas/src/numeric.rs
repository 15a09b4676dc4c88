//! Lenient numeric deserializers for operational records.
//!
//! Farm logs are typed in by hand and synced from spreadsheets, so a numeric
//! column may hold a number, a numeric string, `null`, or free text. These
//! helpers accept all of them: anything that is not a finite number reads as
//! zero (or `None` for the optional variants). Sign is preserved; clamping is
//! left to the aggregator.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interprets a loosely-typed value as a finite `f64`.
pub fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Interprets a loosely-typed value as a whole count. Fractions are truncated.
pub fn count_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

/// Use with `#[serde(default, deserialize_with = "lenient_f64")]`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value).unwrap_or(0.0))
}

pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Use with `#[serde(default, deserialize_with = "lenient_count")]`.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value).unwrap_or(0))
}
