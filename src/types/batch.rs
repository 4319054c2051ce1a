//! Batch manifest records, remote files and batch jobs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{ChatMessage, ModelConfig};

/// Lifecycle state of a remote batch job.
///
/// Statuses this crate does not know are kept verbatim in `Other` so failure
/// messages can report exactly what the provider said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BatchJobStatus {
    Queued,
    Running,
    Success,
    Failed,
    TimeoutExceeded,
    CancellationRequested,
    Cancelled,
    Other(String),
}

impl BatchJobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::TimeoutExceeded => "TIMEOUT_EXCEEDED",
            Self::CancellationRequested => "CANCELLATION_REQUESTED",
            Self::Cancelled => "CANCELLED",
            Self::Other(status) => status,
        }
    }

    /// The job may still make progress; keep polling.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for BatchJobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "TIMEOUT_EXCEEDED" => Self::TimeoutExceeded,
            "CANCELLATION_REQUESTED" => Self::CancellationRequested,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for BatchJobStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<BatchJobStatus> for String {
    fn from(status: BatchJobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BatchJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote batch job as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: BatchJobStatus,
    #[serde(default)]
    pub input_files: Vec<String>,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub error_file: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub total_requests: Option<u64>,
    #[serde(default)]
    pub succeeded_requests: Option<u64>,
    #[serde(default)]
    pub failed_requests: Option<u64>,
}

/// Body of a batch job creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJobCreateRequest {
    pub input_files: Vec<String>,
    pub model: String,
    pub endpoint: String,
    pub metadata: BTreeMap<String, String>,
}

/// File stored on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub created_at: Option<u64>,
}

/// Per-record request body of a batch manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestBody {
    pub max_tokens: u32,
    pub temperature: f64,
    pub response_format: Option<Value>,
    pub random_seed: u64,
    pub n: u32,
    pub messages: Vec<ChatMessage>,
}

/// One line of a batch manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestRecord {
    pub custom_id: String,
    pub body: BatchRequestBody,
}

impl BatchRequestRecord {
    pub fn new(custom_id: impl Into<String>, prompt: &str, config: &ModelConfig) -> Self {
        Self {
            custom_id: custom_id.into(),
            body: BatchRequestBody {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                response_format: config.response_format.clone(),
                random_seed: config.random_seed,
                n: config.n,
                messages: vec![ChatMessage::user(prompt)],
            },
        }
    }
}

/// Response part of a batch output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub status_code: Option<u16>,
    pub body: Value,
}

/// One line of a batch output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResultRecord {
    pub custom_id: String,
    pub response: BatchResponse,
}
