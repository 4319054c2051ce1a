//! Completion payload helpers.

use serde_json::Value;

use crate::error::InferenceError;

/// Raw text of the first choice (`choices[0].message.content`).
pub fn completion_text(raw: &Value) -> Result<&str, InferenceError> {
    raw.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            InferenceError::InvalidResponse(format!(
                "missing choices[0].message.content in {}",
                truncate(&raw.to_string(), 500)
            ))
        })
}

/// Parse the first choice's content as structured JSON.
///
/// Fails with [`InferenceError::ParseError`] carrying the offending content
/// when the model did not return valid JSON.
pub fn parse_completion_content(raw: &Value) -> Result<Value, InferenceError> {
    let content = completion_text(raw)?;
    serde_json::from_str(content).map_err(|e| InferenceError::ParseError {
        message: e.to_string(),
        raw: content.to_string(),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
