//! Cleanup of model output before it is trusted as a record array.
//!
//! Models wrap JSON in markdown fences, prepend chatter, or append notes after
//! the array. These helpers reduce a reply to the bracketed payload.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::record::ExtractionRecord;

static ARRAY_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array pattern"));

#[derive(Error, Debug)]
pub enum ResponseParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of postings, got {0}")]
    NotAnArray(&'static str),

    #[error("posting #{index} is not a JSON object")]
    NotAnObject { index: usize },
}

/// Removes markdown code fence markers anywhere in the reply.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// First `[` through last `]`, or the whole trimmed text when there is no bracket pair.
pub fn array_payload(cleaned: &str) -> &str {
    match ARRAY_SPAN.find(cleaned) {
        Some(span) => span.as_str(),
        None => cleaned.trim(),
    }
}

/// Full cleanup and parse of a completion reply into records.
pub fn parse_records(raw: &str) -> Result<Vec<ExtractionRecord>, ResponseParseError> {
    let cleaned = strip_code_fences(raw);
    let payload = array_payload(&cleaned);

    let value: Value = serde_json::from_str(payload)?;
    let items = match value {
        Value::Array(items) => items,
        other => return Err(ResponseParseError::NotAnArray(json_kind(&other))),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .map(ExtractionRecord::from_json_object)
                .ok_or(ResponseParseError::NotAnObject { index })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
