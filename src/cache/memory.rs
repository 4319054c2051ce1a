//! In-process cache.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use super::{CacheStorage, hash_key};
use crate::error::InferenceError;

/// Map-backed cache. Entries are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, InferenceError> {
        let hashed_key = hash_key(key);
        let entries = self.entries.read().map_err(|_| InferenceError::CacheCorrupted {
            key: hashed_key.clone(),
            message: "cache lock poisoned".to_string(),
        })?;
        let hit = entries.get(&hashed_key).cloned();
        debug!(key = %hashed_key, hit = hit.is_some(), "Memory cache lookup");
        Ok(hit)
    }

    fn put(&self, key: &str, value: &Value) -> Result<(), InferenceError> {
        let hashed_key = hash_key(key);
        let mut entries = self
            .entries
            .write()
            .map_err(|_| InferenceError::CacheError("cache lock poisoned".to_string()))?;
        entries.insert(hashed_key, value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn distinct_keys_are_independent() {
        let cache = MemoryCacheStorage::new();
        cache.put("first prompt", &json!({"r": 1})).unwrap();
        cache.put("second prompt", &json!({"r": 2})).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first prompt").unwrap(), Some(json!({"r": 1})));
        assert_eq!(cache.get("second prompt").unwrap(), Some(json!({"r": 2})));
        assert_eq!(cache.get("third prompt").unwrap(), None);
    }

    #[test]
    fn len_still_counts_entries_after_a_writer_panicked() {
        let cache = std::sync::Arc::new(MemoryCacheStorage::new());
        cache.put("kept", &json!(1)).unwrap();

        let writer = std::sync::Arc::clone(&cache);
        let outcome = std::thread::spawn(move || {
            let _guard = writer.entries.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
        assert!(cache.put("later", &json!(2)).is_err());
    }
}
