//! Cache scoped to one process run.

use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

use super::CacheStorage;
use super::file_store::FileStore;
use crate::error::InferenceError;

/// File-backed cache living in a fresh temporary directory.
///
/// The directory and everything in it is deleted when the store is dropped.
#[derive(Debug)]
pub struct TmpCacheStorage {
    store: FileStore,
    _dir: TempDir,
}

impl TmpCacheStorage {
    pub fn new() -> Result<Self, InferenceError> {
        let dir = tempfile::Builder::new()
            .prefix("llm-inference-cache-")
            .tempdir()
            .map_err(|e| InferenceError::CacheError(format!("cannot create temp dir: {e}")))?;
        Ok(Self {
            store: FileStore::new(dir.path().to_path_buf()),
            _dir: dir,
        })
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }
}

impl CacheStorage for TmpCacheStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, InferenceError> {
        self.store.get(key)
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), InferenceError> {
        self.store.put(key, value)
    }
}
