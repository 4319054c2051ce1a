//! Concurrent-call backend
//!
//! Fans a submission out into one task per prompt. Every live call first
//! takes a token from the backend's [`RateLimiter`] and is retried on
//! throttling; cache hits skip both. Results are yielded as tasks finish, so
//! a slow prompt never holds back faster ones. Callers that need input order
//! must re-sort by identifier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use super::{CacheLayer, InferenceBackend, InferenceStream, InferenceStreamHandle};
use crate::cache::CacheStorage;
use crate::defaults::dispatch;
use crate::error::InferenceError;
use crate::provider::CompletionProvider;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{ChatCompletionRequest, InferenceResult, ModelConfig, PromptItem};
use crate::utils::cancel::{CancelHandle, new_cancel_handle};

struct Inner {
    provider: Arc<dyn CompletionProvider>,
    limiter: Arc<RateLimiter>,
    cache: CacheLayer,
    retry: RetryExecutor,
}

/// Rate-limited concurrent backend. Cheap to clone; clones share the
/// provider, cache and rate budget.
#[derive(Clone)]
pub struct ConcurrentBackend {
    inner: Arc<Inner>,
}

impl ConcurrentBackend {
    /// Backend with the default budget of 6 calls per second.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Result<Self, InferenceError> {
        Self::with_rate_limit(provider, dispatch::RATE, dispatch::RATE_PERIOD)
    }

    /// Backend admitting at most `rate` live calls per `per`.
    pub fn with_rate_limit(
        provider: Arc<dyn CompletionProvider>,
        rate: u32,
        per: Duration,
    ) -> Result<Self, InferenceError> {
        let limiter = RateLimiter::new(rate, per)?;
        Ok(Self {
            inner: Arc::new(Inner {
                provider,
                limiter: Arc::new(limiter),
                cache: CacheLayer::disabled(),
                retry: RetryExecutor::new(RetryPolicy::default()),
            }),
        })
    }

    pub fn with_cache(self, storage: Arc<dyn CacheStorage>) -> Self {
        self.map_inner(|inner| inner.cache = CacheLayer::new(storage))
    }

    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        self.map_inner(|inner| inner.retry = RetryExecutor::new(policy))
    }

    /// Share an existing limiter, e.g. between backends hitting one account.
    pub fn with_limiter(self, limiter: Arc<RateLimiter>) -> Self {
        self.map_inner(|inner| inner.limiter = limiter)
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                provider: shared.provider.clone(),
                limiter: shared.limiter.clone(),
                cache: shared.cache.clone(),
                retry: shared.retry.clone(),
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Like [`InferenceBackend::infer_many`], with a handle that stops the
    /// stream and aborts every prompt still in flight.
    pub fn infer_many_with_cancel(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
    ) -> InferenceStreamHandle {
        let cancel = new_cancel_handle();
        let stream = self.dispatch(items, config, use_cache, cancel.clone());
        InferenceStreamHandle { stream, cancel }
    }

    fn dispatch(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
        cancel: CancelHandle,
    ) -> InferenceStream {
        let backend = self.clone();
        Box::pin(async_stream::stream! {
            let config = Arc::new(config);
            // Dropping the set aborts whatever is still running.
            let mut tasks = JoinSet::new();
            for (index, item) in items.into_iter().enumerate() {
                let backend = backend.clone();
                let config = Arc::clone(&config);
                tasks.spawn(async move {
                    let custom_id = item.resolved_id(index);
                    let payload = backend.infer_one(&item.prompt, &config, use_cache).await?;
                    InferenceResult::tagged(custom_id, &payload)
                });
            }
            debug!(tasks = tasks.len(), "Dispatched prompts");

            loop {
                let joined = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(pending = tasks.len(), "Dispatch cancelled");
                        tasks.abort_all();
                        break;
                    }
                    joined = tasks.join_next() => joined,
                };
                let Some(joined) = joined else { break };
                let result = joined.map_err(InferenceError::from).and_then(|r| r);
                if let Err(e) = &result {
                    warn!(error = %e, pending = tasks.len(), "Prompt failed, aborting the rest");
                    tasks.abort_all();
                }
                let failed = result.is_err();
                yield result;
                if failed {
                    break;
                }
            }
        })
    }
}

impl std::fmt::Debug for ConcurrentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentBackend")
            .field("rate", &self.inner.limiter.rate())
            .field("per", &self.inner.limiter.per())
            .field("cache", &self.inner.cache)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceBackend for ConcurrentBackend {
    #[instrument(skip_all, fields(model = %config.model, use_cache = use_cache))]
    async fn infer_one(
        &self,
        prompt: &str,
        config: &ModelConfig,
        use_cache: bool,
    ) -> Result<Value, InferenceError> {
        let request = ChatCompletionRequest::from_prompt(prompt, config);
        let request = &request;
        let provider = self.inner.provider.as_ref();
        let limiter = self.inner.limiter.as_ref();
        self.inner
            .cache
            .get_or_compute(prompt, use_cache, || async move {
                config.validate()?;
                self.inner
                    .retry
                    .execute(move || async move {
                        limiter.acquire().await;
                        provider.complete(request).await
                    })
                    .await
            })
            .await
    }

    fn infer_many(
        &self,
        items: Vec<PromptItem>,
        config: ModelConfig,
        use_cache: bool,
    ) -> InferenceStream {
        self.dispatch(items, config, use_cache, new_cancel_handle())
    }
}
