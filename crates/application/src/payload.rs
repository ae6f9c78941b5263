//! Lenient field readers for provider JSON payloads.
//!
//! Providers disagree on field casing and on whether numbers are quoted, so
//! every reader takes a list of candidate keys and returns `None` instead of
//! failing on absent or malformed values.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

/// Returns the `data` envelope of a response body.
pub(crate) fn data(body: &Value) -> Option<&Value> {
    body.get("data")
}

/// Returns the list under `data.<key>`, or an empty list when any level is missing.
///
/// A `data` envelope that is itself an array is returned as is.
pub(crate) fn data_list<'a>(body: &'a Value, key: &str) -> Vec<&'a Value> {
    match data(body) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(envelope) => envelope
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Returns the first candidate key holding a non-blank string or a number.
pub(crate) fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// Returns the first candidate key holding a JSON object.
pub(crate) fn object_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|field| field.is_object()))
}

/// Returns the first candidate key holding an array.
pub(crate) fn array_field<'a>(value: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Returns the first candidate key holding a decimal, quoted or not.
pub(crate) fn decimal_field(value: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(parse_decimal))
}

/// Returns the first candidate key holding a non-negative integer that fits in `u32`.
pub(crate) fn u32_field(value: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| match value.get(*key) {
        Some(Value::Number(number)) => number.as_u64().and_then(|raw| u32::try_from(raw).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Returns the first candidate key holding a timestamp.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and plain dates (UTC midnight).
pub(crate) fn datetime_field(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .and_then(parse_datetime)
    })
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Encodes a decimal as a JSON number, falling back to a string when it has no
/// finite `f64` representation.
pub(crate) fn decimal_to_json(value: Decimal) -> Value {
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| Value::String(value.to_string()), Value::Number)
}

/// Builds a JSON object from key/value pairs.
pub(crate) fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    let map: Map<String, Value> = entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect();
    Value::Object(map)
}
