//! Type Conversions for InferenceError
//!
//! This module contains From trait implementations for converting
//! common error types into InferenceError.

use super::types::InferenceError;

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for InferenceError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for InferenceError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::InternalError("inference task was cancelled".to_string())
        } else {
            Self::InternalError(format!("inference task panicked: {err}"))
        }
    }
}
