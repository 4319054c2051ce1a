//! Persistent directory-backed cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::CacheStorage;
use super::file_store::FileStore;
use crate::error::InferenceError;
use crate::settings::Settings;

/// Stores each entry as `<digest>.cache` JSON under a directory that outlives
/// the process.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    store: FileStore,
}

impl DiskCacheStorage {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, InferenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            InferenceError::CacheError(format!(
                "cannot create cache directory {}: {e}",
                dir.display()
            ))
        })?;
        debug!(dir = %dir.display(), "Disk cache ready");
        Ok(Self {
            store: FileStore::new(dir),
        })
    }

    /// Open `<settings.cache_dir>/<subdir>`, or the cache root itself when
    /// `subdir` is `None`.
    pub fn from_settings(
        settings: &Settings,
        subdir: Option<&str>,
    ) -> Result<Self, InferenceError> {
        match subdir {
            Some(subdir) => Self::new(settings.cache_dir.join(subdir)),
            None => Self::new(settings.cache_dir.clone()),
        }
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }
}

impl CacheStorage for DiskCacheStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, InferenceError> {
        self.store.get(key)
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), InferenceError> {
        self.store.put(key, value)
    }
}
