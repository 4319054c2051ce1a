//! Default Configuration Values
//!
//! This module centralizes the default values used by the providers, backends
//! and cache stores so they can be found and adjusted in one place.

use std::time::Duration;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default request timeout for HTTP requests
    ///
    /// Set to 60 seconds to accommodate large models that may take
    /// 10-20 seconds to respond, plus network latency and proxy delays.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default connection timeout for establishing HTTP connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default User-Agent string for HTTP requests
    pub const USER_AGENT: &str = concat!("llm-inference/", env!("CARGO_PKG_VERSION"));
}

/// Mistral API defaults
pub mod mistral {
    /// Public API root. Endpoint paths already carry the `/v1` prefix.
    pub const BASE_URL: &str = "https://api.mistral.ai";

    /// Endpoint batch jobs are run against
    pub const BATCH_ENDPOINT: &str = "/v1/chat/completions";

    /// Name given to uploaded batch manifests
    pub const BATCH_FILE_NAME: &str = "batch.jsonl";

    /// Upload purpose for batch manifests
    pub const BATCH_FILE_PURPOSE: &str = "batch";

    pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";
    pub const BASE_URL_ENV: &str = "MISTRAL_BASE_URL";
}

/// Concurrent dispatch and retry defaults
pub mod dispatch {
    use super::*;

    /// Calls admitted per `RATE_PERIOD`
    pub const RATE: u32 = 6;

    /// Token bucket refill period
    pub const RATE_PERIOD: Duration = Duration::from_secs(1);

    /// Maximum attempts for a throttled call (first attempt included)
    pub const MAX_ATTEMPTS: u32 = 5;

    /// Delay before the first retry; doubled on every further retry
    pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
}

/// Batch job defaults
pub mod batch {
    use super::*;

    /// Interval between two job status polls
    pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

    /// Prefix of manifest cache keys
    pub const CACHE_KEY_PREFIX: &str = "mistral_batch_";
}

/// Cache defaults
pub mod cache {
    /// Root directory of persistent caches, relative to the working directory
    pub const CACHE_DIR: &str = ".cache";

    /// Extension of cache files
    pub const FILE_EXTENSION: &str = "cache";

    pub const CACHE_DIR_ENV: &str = "LLM_INFERENCE_CACHE_DIR";
}

/// Logging defaults
pub mod logging {
    pub const LEVEL: &str = "info";

    pub const LEVEL_ENV: &str = "LLM_INFERENCE_LOG_LEVEL";
}
