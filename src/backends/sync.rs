//! Single-call backend
//!
//! One provider call at a time on the caller's task. Results come back in
//! input order; this is the reference path for low-volume or cache-dominated
//! workloads.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{CacheLayer, InferenceBackend, InferenceStream};
use crate::cache::CacheStorage;
use crate::error::InferenceError;
use crate::provider::CompletionProvider;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{ChatCompletionRequest, InferenceResult, ModelConfig, PromptItem};

/// Sequential backend. Cheap to clone.
#[derive(Clone)]
pub struct SyncBackend {
    provider: Arc<dyn CompletionProvider>,
    cache: CacheLayer,
    retry: RetryExecutor,
}

impl SyncBackend {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            cache: CacheLayer::disabled(),
            retry: RetryExecutor::new(RetryPolicy::default()),
        }
    }

    pub fn with_cache(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache = CacheLayer::new(storage);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }
}

impl std::fmt::Debug for SyncBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBackend")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceBackend for SyncBackend {
    #[instrument(skip_all, fields(model = %config.model, use_cache = use_cache))]
    async fn infer_one(
        &self,
        prompt: &str,
        config: &ModelConfig,
        use_cache: bool,
    ) -> Result<Value, InferenceError> {
        let request = ChatCompletionRequest::from_prompt(prompt, config);
        let request = &request;
        let provider = self.provider.as_ref();
        // Cache hits are served whatever the parameters; only live calls
        // need a valid configuration.
        self.cache
            .get_or_compute(prompt, use_cache, || async move {
                config.validate()?;
                self.retry.execute(move || provider.complete(request)).await
            })
            .await
    }

    fn infer_many(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
    ) -> InferenceStream {
        let backend = self.clone();
        Box::pin(async_stream::stream! {
            let total = items.len();
            for (index, item) in items.into_iter().enumerate() {
                let custom_id = item.resolved_id(index);
                debug!(custom_id = %custom_id, index, total, "Running prompt");
                let result = match backend.infer_one(&item.prompt, &config, use_cache).await {
                    Ok(payload) => InferenceResult::tagged(custom_id, &payload),
                    Err(e) => Err(e),
                };
                let failed = result.is_err();
                yield result;
                if failed {
                    break;
                }
            }
        })
    }
}
