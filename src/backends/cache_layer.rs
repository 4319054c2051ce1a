//! Cache-around helper shared by the backends.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::CacheStorage;
use crate::error::InferenceError;

/// Optional cache in front of provider calls.
///
/// Storage access runs on the blocking pool so file I/O never stalls the
/// runtime's worker threads.
#[derive(Clone, Default)]
pub struct CacheLayer {
    storage: Option<Arc<dyn CacheStorage>>,
}

impl CacheLayer {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    /// A layer that never hits and never stores.
    pub fn disabled() -> Self {
        Self { storage: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<Value>, InferenceError> {
        let Some(storage) = self.storage.clone() else {
            return Ok(None);
        };
        let key = key.to_string();
        tokio::task::spawn_blocking(move || storage.get(&key)).await?
    }

    pub async fn store(&self, key: &str, value: &Value) -> Result<(), InferenceError> {
        let Some(storage) = self.storage.clone() else {
            return Ok(());
        };
        let key = key.to_string();
        let value = value.clone();
        tokio::task::spawn_blocking(move || storage.put(&key, &value)).await?
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// output. With `use_cache == false` the cache is neither read nor
    /// written.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        use_cache: bool,
        compute: F,
    ) -> Result<Value, InferenceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, InferenceError>>,
    {
        let enabled = use_cache && self.is_enabled();
        if enabled {
            if let Some(hit) = self.lookup(key).await? {
                debug!("Serving response from cache");
                return Ok(hit);
            }
        }
        let value = compute().await?;
        if enabled {
            self.store(key, &value).await?;
        }
        Ok(value)
    }
}

impl fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLayer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
