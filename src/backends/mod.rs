//! Inference backends
//!
//! Three ways of running prompts against the same provider, behind one
//! [`InferenceBackend`] interface:
//!
//! - [`SyncBackend`]: one call at a time, results in input order
//! - [`ConcurrentBackend`]: one task per prompt under a rate budget, results
//!   in completion order
//! - [`BatchBackend`]: a single provider-side batch job per submission
//!
//! Every result carries the identifier its prompt was submitted under. A
//! result stream ends after the first error it yields.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use serde_json::Value;

use crate::error::InferenceError;
use crate::response::parse_completion_content;
use crate::types::{InferenceResult, ModelConfig, PromptItem};
use crate::utils::cancel::CancelHandle;

pub mod batch;
mod cache_layer;
pub mod concurrent;
pub mod sync;

pub use batch::BatchBackend;
pub use cache_layer::CacheLayer;
pub use concurrent::ConcurrentBackend;
pub use sync::SyncBackend;

/// Stream of tagged results.
pub type InferenceStream =
    Pin<Box<dyn Stream<Item = Result<InferenceResult, InferenceError>> + Send>>;

/// Result stream with a cancellation handle.
///
/// Cancelling ends the stream and abandons work that has not completed yet.
pub struct InferenceStreamHandle {
    /// The underlying result stream
    pub stream: InferenceStream,
    /// Handle to cancel the stream
    pub cancel: CancelHandle,
}

impl std::fmt::Debug for InferenceStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceStreamHandle")
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

/// Common contract of all backends.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run one prompt and return the provider's raw response.
    ///
    /// With `use_cache` a stored response for the same prompt is returned
    /// unchanged and no provider call is made.
    async fn infer_one(
        &self,
        prompt: &str,
        config: &ModelConfig,
        use_cache: bool,
    ) -> Result<Value, InferenceError>;

    /// Run every item, yielding one result per item.
    ///
    /// Nothing is sent to the provider until the stream is first polled.
    fn infer_many(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
    ) -> InferenceStream;

    /// Extract the structured content of a raw completion response.
    fn parse_response(&self, raw: &Value) -> Result<Value, InferenceError> {
        parse_completion_content(raw)
    }
}

/// Drain a result stream, stopping at the first error.
pub async fn collect_all(stream: InferenceStream) -> Result<Vec<InferenceResult>, InferenceError> {
    stream.try_collect().await
}
