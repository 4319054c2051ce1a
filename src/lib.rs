//! llm-inference
//!
//! Cached prompt inference against a remote LLM provider, with three
//! execution strategies behind one interface:
//!
//! - [`SyncBackend`]: sequential calls, results in input order
//! - [`ConcurrentBackend`]: rate-limited fan-out, results in completion order
//! - [`BatchBackend`]: one provider-side batch job per submission
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use llm_inference::prelude::*;
//!
//! # async fn run() -> Result<(), InferenceError> {
//! let client = Arc::new(MistralClient::new(MistralConfig::from_env()?)?);
//! let backend = ConcurrentBackend::new(client)?
//!     .with_cache(Arc::new(DiskCacheStorage::new(".cache/mistral")?));
//!
//! let items = vec![
//!     PromptItem::new("doc-1", "Summarise: ..."),
//!     PromptItem::new("doc-2", "Summarise: ..."),
//! ];
//! let mut results = backend.infer_many(items, ModelConfig::new("mistral-small-latest"), true);
//! while let Some(result) = results.next().await {
//!     let result = result?;
//!     println!("{}: {}", result.custom_id, result.payload);
//! }
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod backends;
pub mod cache;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod provider;
pub mod rate_limit;
pub mod response;
pub mod retry;
pub mod settings;
pub mod types;
pub mod utils;

pub use backends::{
    BatchBackend, ConcurrentBackend, InferenceBackend, InferenceStream, InferenceStreamHandle,
    SyncBackend, collect_all,
};
pub use cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage, TmpCacheStorage};
pub use error::{ErrorCategory, InferenceError};
pub use provider::{BatchProvider, CompletionProvider, MistralClient, MistralConfig};
pub use rate_limit::RateLimiter;
pub use retry::{RetryExecutor, RetryPolicy};
pub use settings::Settings;
pub use types::{InferenceResult, ModelConfig, PromptItem};

/// Commonly used types.
pub mod prelude {
    pub use crate::backends::{
        BatchBackend, ConcurrentBackend, InferenceBackend, InferenceStream,
        InferenceStreamHandle, SyncBackend, collect_all,
    };
    pub use crate::cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage, TmpCacheStorage};
    pub use crate::error::InferenceError;
    pub use crate::provider::{BatchProvider, CompletionProvider, MistralClient, MistralConfig};
    pub use crate::rate_limit::RateLimiter;
    pub use crate::retry::RetryPolicy;
    pub use crate::settings::Settings;
    pub use crate::types::{InferenceResult, ModelConfig, PromptItem};
    pub use crate::utils::cancel::CancelHandle;
}
