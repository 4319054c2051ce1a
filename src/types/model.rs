//! Model configuration and the single-call request body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InferenceError;

/// Sampling configuration shared by every prompt of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub random_seed: u64,
    /// Structured output schema, e.g. `{"type": "json_object"}`
    #[serde(default)]
    pub response_format: Option<Value>,
    #[serde(default = "default_n")]
    pub n: u32,
}

const fn default_n() -> u32 {
    1
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1024,
            random_seed: 42,
            response_format: None,
            n: default_n(),
        }
    }

    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub const fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    pub fn with_response_format(mut self, response_format: Value) -> Self {
        self.response_format = Some(response_format);
        self
    }

    /// Request JSON object output.
    pub fn with_json_output(self) -> Self {
        self.with_response_format(serde_json::json!({"type": "json_object"}))
    }

    pub const fn with_n(mut self, n: u32) -> Self {
        self.n = n;
        self
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.model.trim().is_empty() {
            return Err(InferenceError::InvalidParameter(
                "model cannot be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(InferenceError::InvalidParameter(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.n == 0 {
            return Err(InferenceError::InvalidParameter(
                "n must be at least 1".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(InferenceError::InvalidParameter(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a single chat completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub random_seed: u64,
    pub response_format: Option<Value>,
    pub n: u32,
}

impl ChatCompletionRequest {
    pub fn from_prompt(prompt: &str, config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            random_seed: config.random_seed,
            response_format: config.response_format.clone(),
            n: config.n,
        }
    }
}
