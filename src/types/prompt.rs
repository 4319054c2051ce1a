//! Prompt inputs and tagged inference results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InferenceError;

/// Field under which the caller's identifier is attached to every payload.
pub const CUSTOM_ID_FIELD: &str = "custom_id";

/// One prompt submitted to a backend.
///
/// The identifier is opaque to this crate and echoed back verbatim on the
/// matching [`InferenceResult`]. Items without one are identified by their
/// position in the submitted list. Uniqueness is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    pub prompt: String,
}

impl PromptItem {
    pub fn new(custom_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            custom_id: Some(custom_id.into()),
            prompt: prompt.into(),
        }
    }

    /// A prompt identified by its position in the submitted list.
    pub fn anonymous(prompt: impl Into<String>) -> Self {
        Self {
            custom_id: None,
            prompt: prompt.into(),
        }
    }

    /// Identifier used on the wire and on the result: the caller's id, or
    /// `index` rendered as a decimal string.
    pub fn resolved_id(&self, index: usize) -> String {
        self.custom_id.clone().unwrap_or_else(|| index.to_string())
    }
}

impl From<&str> for PromptItem {
    fn from(prompt: &str) -> Self {
        Self::anonymous(prompt)
    }
}

impl From<String> for PromptItem {
    fn from(prompt: String) -> Self {
        Self::anonymous(prompt)
    }
}

/// Result of one prompt, tagged with the identifier it was submitted under.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub custom_id: String,
    /// Raw provider response merged with the `custom_id` field
    pub payload: Value,
}

impl InferenceResult {
    /// Build a result from a (possibly cached, shared) provider payload.
    ///
    /// The payload is copied; the source value is never modified.
    pub fn tagged(custom_id: impl Into<String>, payload: &Value) -> Result<Self, InferenceError> {
        let custom_id = custom_id.into();
        let Some(fields) = payload.as_object() else {
            return Err(InferenceError::InvalidResponse(format!(
                "expected a JSON object payload for custom_id={custom_id}, got {payload}"
            )));
        };
        let mut merged = serde_json::Map::with_capacity(fields.len() + 1);
        merged.insert(CUSTOM_ID_FIELD.to_string(), Value::String(custom_id.clone()));
        for (key, value) in fields {
            if key != CUSTOM_ID_FIELD {
                merged.insert(key.clone(), value.clone());
            }
        }
        Ok(Self {
            custom_id,
            payload: Value::Object(merged),
        })
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}
