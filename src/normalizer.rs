//! Normalization of analysis output
//!
//! The analysis capability is best-effort: it may return too few or too many
//! items, numbers as strings, out-of-range scores or junk flags. This module
//! turns whatever came back into exactly one [`AnalysisResult`] per message.

use serde_json::Value;

use crate::error::{ChatToxicityError, Result};
use crate::models::AnalysisResult;

/// Coerce raw analysis output into `expected_count` clamped results.
///
/// Missing tail items are padded with neutral results and surplus items are
/// dropped. Fails only when `raw` is not an array at all.
pub fn normalize(raw: &Value, expected_count: usize) -> Result<Vec<AnalysisResult>> {
    let Value::Array(items) = raw else {
        return Err(ChatToxicityError::MalformedAnalysisOutput(format!(
            "expected array, got {}",
            type_name(raw)
        )));
    };

    if items.len() != expected_count {
        tracing::warn!(
            received = items.len(),
            expected = expected_count,
            "Analysis count mismatch, padding or truncating"
        );
    }

    let mut results: Vec<AnalysisResult> = items.iter().take(expected_count).map(normalize_item).collect();
    results.resize_with(expected_count, AnalysisResult::neutral);
    Ok(results)
}

/// Neutral fallback for `count` messages
#[must_use]
pub fn neutral_results(count: usize) -> Vec<AnalysisResult> {
    vec![AnalysisResult::neutral(); count]
}

fn normalize_item(item: &Value) -> AnalysisResult {
    AnalysisResult {
        toxicity_score: coerce_score(item.get("toxicity_score")).clamp(0.0, 1.0),
        sentiment_score: coerce_score(item.get("sentiment_score")).clamp(-1.0, 1.0),
        flags: coerce_flags(item.get("flags")),
    }
}

/// Numeric coercion: numbers pass through, numeric strings are parsed,
/// booleans count as 1/0, anything else (including NaN) is 0.
fn coerce_score(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if number.is_nan() {
        0.0
    } else {
        number
    }
}

fn coerce_flags(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    let mut flags: Vec<String> = Vec::with_capacity(entries.len());
    for flag in entries.iter().filter_map(Value::as_str) {
        if !flags.iter().any(|f| f == flag) {
            flags.push(flag.to_string());
        }
    }
    flags
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
