//! One-file-per-key JSON store shared by the disk and tmp caches.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info};

use super::hash_key;
use crate::defaults::cache::FILE_EXTENSION;
use crate::error::InferenceError;

#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn path_for(&self, hashed_key: &str) -> PathBuf {
        self.dir.join(format!("{hashed_key}.{FILE_EXTENSION}"))
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Value>, InferenceError> {
        let hashed_key = hash_key(key);
        debug!(key = %hashed_key, "Attempting to retrieve cache entry");
        let path = self.path_for(&hashed_key);

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %hashed_key, "Cache file not found");
                return Ok(None);
            }
            Err(e) => {
                error!(key = %hashed_key, error = %e, "Error reading cache entry");
                return Err(InferenceError::CacheCorrupted {
                    key: hashed_key,
                    message: e.to_string(),
                });
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => {
                info!(key = %hashed_key, "Cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                error!(key = %hashed_key, error = %e, "Cache entry is not valid JSON");
                Err(InferenceError::CacheCorrupted {
                    key: hashed_key,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Write to a sibling temp file and rename it over the target so readers
    /// never observe a partial entry.
    pub(crate) fn put(&self, key: &str, value: &Value) -> Result<(), InferenceError> {
        let hashed_key = hash_key(key);
        debug!(key = %hashed_key, "Storing cache entry");
        let path = self.path_for(&hashed_key);

        let write = || -> Result<(), InferenceError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
            serde_json::to_writer(&mut tmp, value)?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        };

        match write() {
            Ok(()) => {
                debug!(key = %hashed_key, "Cache entry stored");
                Ok(())
            }
            Err(e) => {
                error!(key = %hashed_key, error = %e, "Error storing cache entry");
                Err(InferenceError::CacheError(format!(
                    "failed to store {}: {e}",
                    path.display()
                )))
            }
        }
    }
}
