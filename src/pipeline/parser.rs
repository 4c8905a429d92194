//! Parsing of the engine's extraction reply.
//!
//! Engines wrap JSON in markdown fences, emit numbers as strings, and
//! put "5-10" where two bounds belong. The parser repairs what it can
//! and rejects the rest; range checks against species norms and other
//! business validation happen upstream.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

use super::ExtractionError;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub clinic_name: Option<String>,
    pub test_type: Option<String>,
    pub test_date: Option<NaiveDate>,
    pub metrics: Vec<ExtractedMetric>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetric {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Parses the engine reply into a structured result. On any shape
/// failure the raw reply is preserved so callers can surface it.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult, ExtractionError> {
    let candidate = strip_fences(raw);
    let value: Value = serde_json::from_str(candidate).map_err(|_| {
        ExtractionError::MalformedExtraction {
            raw: raw.to_string(),
        }
    })?;

    let Some(object) = value.as_object() else {
        return Err(ExtractionError::MalformedExtraction {
            raw: raw.to_string(),
        });
    };

    let metrics_value = object.get("metrics").and_then(Value::as_array);
    let Some(entries) = metrics_value else {
        return Err(ExtractionError::MalformedExtraction {
            raw: raw.to_string(),
        });
    };

    let mut metrics = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(metric) = repair_metric(entry) {
            metrics.push(metric);
        }
    }

    Ok(ExtractionResult {
        clinic_name: string_field(object.get("clinicName")),
        test_type: string_field(object.get("testType")),
        test_date: string_field(object.get("testDate"))
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        metrics,
    })
}

/// Unwraps a fenced reply; leaves unfenced replies alone.
fn strip_fences(raw: &str) -> &str {
    match fence_regex().captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw.trim(),
    }
}

/// One metric entry. Entries missing a name, value, or unit are dropped
/// rather than failing the whole document.
fn repair_metric(entry: &Value) -> Option<ExtractedMetric> {
    let object = entry.as_object()?;
    let name = string_field(object.get("name"))?;
    let unit = string_field(object.get("unit"))?;
    let value = numeric_field(object.get("value"))?;

    let mut reference_min = numeric_field(object.get("referenceMin"));
    let mut reference_max = numeric_field(object.get("referenceMax"));

    // Some engines put the whole printed range into one string field,
    // or into referenceMin itself.
    if reference_min.is_none() && reference_max.is_none() {
        let range_text = string_field(object.get("referenceRange"))
            .or_else(|| non_numeric_string(object.get("referenceMin")));
        if let Some(text) = range_text {
            let (min, max) = parse_reference_range(&text);
            reference_min = min;
            reference_max = max;
        }
    }

    Some(ExtractedMetric {
        name,
        value,
        unit,
        reference_min,
        reference_max,
    })
}

/// Printed reference ranges: "5-10", "5 – 10", "<10", ">5".
pub fn parse_reference_range(text: &str) -> (Option<f64>, Option<f64>) {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('<') {
        return (None, rest.trim().replace(',', ".").parse().ok());
    }
    if let Some(rest) = text.strip_prefix('>') {
        return (rest.trim().replace(',', ".").parse().ok(), None);
    }
    // Split on dash variants, skipping position 0 so a leading minus
    // sign is not mistaken for a separator.
    for (idx, ch) in text.char_indices().skip(1) {
        if matches!(ch, '-' | '–' | '—') {
            let min = text[..idx].trim().replace(',', ".").parse().ok();
            let max = text[idx + ch.len_utf8()..].trim().replace(',', ".").parse().ok();
            if min.is_some() || max.is_some() {
                return (min, max);
            }
        }
    }
    (None, None)
}

/// Non-empty string, with empty strings treated as absent.
fn string_field(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// A string that does not itself parse as a single number.
fn non_numeric_string(value: Option<&Value>) -> Option<String> {
    let s = string_field(value)?;
    if s.replace(',', ".").parse::<f64>().is_ok() {
        None
    } else {
        Some(s)
    }
}

fn numeric_field(value: Option<&Value>) -> Option<f64> {
    coerce_numeric(value?)
}

/// Number, or a numeric string ("7,5" included). Also used by the API
/// layer to coerce manually entered metric values.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}
