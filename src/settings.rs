//! Process-level settings
//!
//! Values that belong to the deployment rather than to a single call: where
//! persistent caches live and how verbose logging is. Read from the
//! environment with [`Settings::from_env`], or built explicitly.

use std::path::{Path, PathBuf};

use crate::defaults;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root directory of persistent caches
    pub cache_dir: PathBuf,
    /// `tracing` filter directive, e.g. `info` or `llm_inference=debug`
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(defaults::cache::CACHE_DIR),
            log_level: defaults::logging::LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// Read `LLM_INFERENCE_CACHE_DIR` and `LLM_INFERENCE_LOG_LEVEL`, falling
    /// back to the defaults for unset or blank variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();
        if let Some(dir) = non_blank(defaults::cache::CACHE_DIR_ENV) {
            settings.cache_dir = PathBuf::from(dir);
        }
        if let Some(level) = non_blank(defaults::logging::LEVEL_ENV) {
            settings.log_level = level.trim().to_string();
        }
        settings
    }

    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
