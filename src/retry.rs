//! Retry Mechanism Module
//!
//! Retries provider calls that were throttled, with exponential backoff.
//! Any other failure is returned to the caller untouched.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::defaults::dispatch;
use crate::error::InferenceError;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Backoff multiplier applied per retry
    pub backoff_multiplier: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: dispatch::MAX_ATTEMPTS,
            initial_delay: dispatch::INITIAL_BACKOFF,
            backoff_multiplier: dispatch::BACKOFF_MULTIPLIER,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts (clamped to at least one)
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier (values below 1.0, and NaN, become 1.0)
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier >= 1.0 { multiplier } else { 1.0 };
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// A single attempt, no backoff.
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    pub fn should_retry(&self, error: &InferenceError) -> bool {
        error.is_retryable()
    }

    /// Delay after the failed attempt `attempt` (0-based), saturating at
    /// `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }
}

/// Runs an operation under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying throttled attempts.
    ///
    /// Returns [`InferenceError::RetriesExhausted`] once every attempt was
    /// throttled. No delay follows the final attempt.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, InferenceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InferenceError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !self.policy.should_retry(&error) {
                return Err(error);
            }

            attempt += 1;
            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(InferenceError::RetriesExhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = self.policy.calculate_delay(attempt - 1);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Rate limit exceeded, retrying"
            );
            sleep(delay).await;
        }
    }
}
