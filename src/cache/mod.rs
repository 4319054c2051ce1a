//! Response cache
//!
//! Key → JSON blob storage used by every backend so identical requests never
//! re-hit the provider.
//!
//! - `disk.rs`: persistent directory, survives restarts
//! - `tmp.rs`: temporary directory, removed when the store is dropped
//! - `memory.rs`: process-local map
//!
//! Every store derives its on-disk/in-map key with [`hash_key`], so a key
//! hashed at write time reproduces identically at read time.

use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::InferenceError;

pub mod disk;
mod file_store;
pub mod memory;
pub mod tmp;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use tmp::TmpCacheStorage;

/// Key → value cache.
///
/// `get` must report unreadable or malformed entries as
/// [`InferenceError::CacheCorrupted`] rather than as a miss, and `put` must
/// propagate write failures. Each call is atomic per key; concurrent writes to
/// the same key race and the last one wins.
pub trait CacheStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, InferenceError>;

    fn put(&self, key: &str, value: &Value) -> Result<(), InferenceError>;
}

/// Lowercase hex SHA-256 digest of `key`'s UTF-8 bytes.
pub fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Serialize `value` with object keys sorted at every depth.
///
/// Two semantically identical values always produce the same string, no
/// matter how their maps were built.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
