//! Error Handling Module
//!
//! This module provides the error type shared by every backend, including:
//! - Core error types (`InferenceError`, `ErrorCategory`)
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_inference::error::{ErrorCategory, InferenceError};
//!
//! let error = InferenceError::RateLimited("http=429".into());
//! assert_eq!(error.category(), ErrorCategory::RateLimit);
//! assert!(error.is_retryable());
//! ```

mod conversions;
pub mod types;

pub use types::*;
