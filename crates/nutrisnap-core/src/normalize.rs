//! Field-by-field coercion of untrusted model payloads
//!
//! The generation model is asked for `{foods: [...], brands: [...]}` but is
//! free to send strings where numbers belong, omit fields, or drop the lists
//! entirely. Everything here degrades to a default instead of failing:
//! numbers become 0, missing weights become "0g", non-list `foods` yields no
//! rows.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::models::{AnalysisResult, BrandItem, FoodItem, NutritionInfo, Weight};

static LEADING_FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid regex")
});

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").expect("valid regex"));

static NUMERIC_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9.]").expect("valid regex"));

/// Leading decimal number of a string ("99.5g" → 99.5), if any
pub fn leading_float(s: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(s)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Leading integer of a string ("250kcal" → 250, "12.7" → 12), if any
pub fn leading_int(s: &str) -> Option<i64> {
    LEADING_INT
        .find(s)
        .and_then(|m| m.as_str().trim().parse::<i64>().ok())
}

/// Coerce an arbitrary JSON value into a non-negative integer
///
/// Numbers truncate toward zero, strings use their leading integer run,
/// everything else is 0. Negative values clamp to 0.
pub fn coerce_int(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => leading_int(s).unwrap_or(0),
        _ => 0,
    };
    raw.clamp(0, u32::MAX as i64) as u32
}

/// Coerce a JSON value into a string field (numbers are stringified)
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split a weight string into magnitude and unit
///
/// The leading float is the magnitude (0 if none); removing every digit and
/// `.` leaves the unit, which defaults to "g".
pub fn parse_weight(raw: &str) -> Weight {
    let magnitude = leading_float(raw).unwrap_or(0.0).max(0.0);
    let stripped = NUMERIC_CHARS.replace_all(raw, "");
    let unit = stripped.trim();
    Weight {
        magnitude,
        unit: if unit.is_empty() {
            "g".to_string()
        } else {
            unit.to_string()
        },
    }
}

pub(crate) fn lenient_int<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_int(&value))
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_string(&value))
}

pub(crate) fn lenient_nutrition_info<'de, D>(
    deserializer: D,
) -> Result<Option<NutritionInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(nutrition_info_from_value(value))
}

/// Falsy values (null, false, 0, "") carry no info; arrays are keyed by index
pub(crate) fn nutrition_info_from_value(value: Value) -> Option<NutritionInfo> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(NutritionInfo::Text("true".to_string())),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(NutritionInfo::Text(s)),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(NutritionInfo::Text(n.to_string())),
        Value::Object(map) => Some(NutritionInfo::Fields(map)),
        Value::Array(items) => Some(NutritionInfo::Fields(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
        )),
    }
}

/// Decode the list under `key`, skipping entries that are not objects
fn decode_list<T>(payload: &Value, key: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(entries) = payload.get(key).and_then(Value::as_array) else {
        debug!(key, "payload has no list, treating as empty");
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(key, error = %e, "skipping undecodable entry");
                None
            }
        })
        .collect()
}

/// Normalize a decoded model payload into typed food and brand records
pub fn normalize_analysis(payload: &Value) -> AnalysisResult {
    AnalysisResult {
        foods: decode_list::<FoodItem>(payload, "foods"),
        brands: decode_list::<BrandItem>(payload, "brands"),
    }
}
