//! Parsing helpers for model responses
//!
//! Model text often carries prose or code fences around the JSON payload, so
//! objects are cut out between the first `{` and the last `}`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, Recalculation};
use crate::normalize::{coerce_string, leading_float, normalize_analysis};

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]").expect("valid regex"));

fn truncate(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Cut the outermost JSON object out of model text and decode it
pub fn extract_json_object(response: &str) -> Result<Value> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from model: {} | Raw: {}",
                    e,
                    truncate(json_str)
                ))
            })
        }
        _ => Err(Error::InvalidData(format!(
            "No JSON found in model response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Text of the first part of the first candidate
pub fn candidate_text(body: &Value) -> Result<&str> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidData("Response has no candidate text".into()))
}

/// Decode analysis text into normalized foods and brands
pub fn parse_analysis_text(text: &str) -> Result<AnalysisResult> {
    let payload = extract_json_object(text)?;
    Ok(normalize_analysis(&payload))
}

fn number_from(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_float(&NON_NUMERIC.replace_all(s, "")).unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.max(0.0)
    } else {
        0.0
    }
}

/// Decode a recalculation answer
///
/// A `{nameKo, nameEn, caloriesPer100g}` object is preferred. Otherwise every
/// character except digits and `.` is stripped and the leading number is
/// used; an unreadable answer yields 0.
pub fn parse_recalculation_text(text: &str) -> Recalculation {
    if let Ok(Value::Object(object)) = extract_json_object(text) {
        let calories = object
            .get("caloriesPer100g")
            .or_else(|| object.get("caloriesPer100"))
            .or_else(|| object.get("calories"))
            .map(number_from)
            .unwrap_or(0.0);
        return Recalculation {
            calories_per_100: calories,
            name_ko: object.get("nameKo").and_then(coerce_string),
            name_en: object.get("nameEn").and_then(coerce_string),
        };
    }

    let digits = NON_NUMERIC.replace_all(text, "");
    Recalculation {
        calories_per_100: leading_float(&digits).unwrap_or(0.0).max(0.0),
        ..Default::default()
    }
}

/// Build an error from a non-OK upstream answer
///
/// Understands the proxy's `{"error": "..."}` and the upstream's
/// `{"error": {"message": "..."}}` bodies.
pub fn upstream_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match value.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) => o.get("message").and_then(Value::as_str).map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Server error occurred during analysis".to_string()
            } else {
                truncate(body.trim())
            }
        });

    Error::Upstream { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_object_with_prose() {
        let value = extract_json_object("Sure! ```json\n{\"foods\": []}\n```").unwrap();
        assert_eq!(value, json!({"foods": []}));

        assert!(matches!(
            extract_json_object("no json here"),
            Err(Error::InvalidData(_))
        ));
        assert!(extract_json_object("{not json}").is_err());
    }

    #[test]
    fn test_candidate_text() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "130"}]}}]});
        assert_eq!(candidate_text(&body).unwrap(), "130");
        assert!(candidate_text(&json!({"candidates": []})).is_err());
    }

    #[test]
    fn test_parse_analysis_text() {
        let text = r#"{"foods": [{"name": "김치찌개", "weight": "300g", "calories": 250}]}"#;
        let result = parse_analysis_text(text).unwrap();
        assert_eq!(result.foods.len(), 1);
        assert!(result.brands.is_empty());
    }

    #[test]
    fn test_parse_recalculation_number() {
        assert_eq!(parse_recalculation_text("130").calories_per_100, 130.0);
        assert_eq!(parse_recalculation_text("약 165.5 kcal").calories_per_100, 165.5);
        assert_eq!(parse_recalculation_text("unknown").calories_per_100, 0.0);
    }

    #[test]
    fn test_parse_recalculation_bilingual() {
        let recalculation = parse_recalculation_text(
            r#"{"nameKo": "현미밥", "nameEn": "Brown Rice", "caloriesPer100g": "110 kcal"}"#,
        );
        assert_eq!(recalculation.calories_per_100, 110.0);
        assert_eq!(recalculation.name_ko.as_deref(), Some("현미밥"));
        assert_eq!(recalculation.name_en.as_deref(), Some("Brown Rice"));
        assert_eq!(recalculation.rate_per_unit(), 1.1);
    }

    #[test]
    fn test_upstream_error_messages() {
        let err = upstream_error(500, r#"{"error": "API Key not configured in environment"}"#);
        assert!(matches!(
            err,
            Error::Upstream { status: 500, ref message } if message == "API Key not configured in environment"
        ));

        let err = upstream_error(400, r#"{"error": {"code": 400, "message": "API key not valid"}}"#);
        assert!(err.to_string().contains("API key not valid"));

        let err = upstream_error(502, "");
        assert!(err.to_string().contains("502"));
    }
}
