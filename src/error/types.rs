//! Core error types.

use thiserror::Error;

/// Coarse classification used for logging and caller-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient provider throttling (HTTP 429)
    RateLimit,
    /// Credentials rejected by the provider
    Authentication,
    /// The request itself was invalid (4xx other than 429/401/403)
    Client,
    /// Provider-side failure (5xx, failed batch job)
    Server,
    /// Transport-level failure
    Network,
    /// Malformed provider output or cached data
    Parsing,
    /// Local cache storage failure
    Cache,
    /// Caller passed an invalid argument or used an unsupported operation
    Validation,
    /// Anything else
    Internal,
}

/// Errors surfaced by the inference core.
///
/// Every variant is fatal to the call that produced it except
/// [`InferenceError::RateLimited`], which the retry policy absorbs until the
/// attempt budget runs out.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// Provider signalled "too many requests".
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Throttling persisted through every allowed attempt.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<InferenceError>,
    },

    /// Batch job reached a terminal state other than success.
    #[error("Batch job {job_id} failed: {status}")]
    BatchJobFailed { job_id: String, status: String },

    /// Stored cache entry exists but cannot be read back.
    #[error("Cache entry {key} is corrupted: {message}")]
    CacheCorrupted { key: String, message: String },

    /// Cache storage could not be written or initialised.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Provider content did not parse as structured data.
    #[error("Parse error: {message} (raw content: {raw})")]
    ParseError { message: String, raw: String },

    /// Provider payload is missing the fields this crate reads.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Returned identifiers do not match the submitted ones.
    #[error("Identifier mismatch: {0}")]
    IdentifierMismatch(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other non-success provider response.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl InferenceError {
    /// Create an API error with a status code and message.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error carrying structured details (e.g. the response body).
    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Only throttling is transient; everything else propagates immediately.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// HTTP status associated with the error, when one is known.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited(_) => Some(429),
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimited(_) | Self::RetriesExhausted { .. } => ErrorCategory::RateLimit,
            Self::AuthenticationError(_) => ErrorCategory::Authentication,
            Self::NotFound(_) | Self::InvalidInput(_) => ErrorCategory::Client,
            Self::ApiError { code, .. } if (400..500).contains(code) => ErrorCategory::Client,
            Self::ApiError { .. } | Self::BatchJobFailed { .. } => ErrorCategory::Server,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ParseError { .. }
            | Self::InvalidResponse(_)
            | Self::IdentifierMismatch(_)
            | Self::JsonError(_) => ErrorCategory::Parsing,
            Self::CacheCorrupted { .. } | Self::CacheError(_) | Self::IoError(_) => {
                ErrorCategory::Cache
            }
            Self::UnsupportedOperation(_)
            | Self::InvalidParameter(_)
            | Self::ConfigurationError(_) => ErrorCategory::Validation,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }
}
