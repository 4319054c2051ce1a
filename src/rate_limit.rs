//! Token-bucket admission control for concurrent dispatch.
//!
//! The bucket holds at most `rate` tokens and refills continuously at
//! `rate / per` tokens per second. Each live provider call debits one token.
//! This is an approximate, liveness-oriented limiter: bursts up to `rate`
//! calls are admitted immediately after an idle period.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::InferenceError;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Shared token bucket. Clone the surrounding `Arc` to hand it to tasks.
#[derive(Debug)]
pub struct RateLimiter {
    rate: u32,
    per: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Admit `rate` calls per `per`, starting with a full bucket.
    pub fn new(rate: u32, per: Duration) -> Result<Self, InferenceError> {
        if rate == 0 {
            return Err(InferenceError::InvalidParameter(
                "rate limiter rate must be at least 1".to_string(),
            ));
        }
        if per.is_zero() {
            return Err(InferenceError::InvalidParameter(
                "rate limiter period must be positive".to_string(),
            ));
        }
        Ok(Self {
            rate,
            per,
            state: Mutex::new(BucketState {
                tokens: f64::from(rate),
                last_refill: Instant::now(),
            }),
        })
    }

    pub const fn rate(&self) -> u32 {
        self.rate
    }

    pub const fn per(&self) -> Duration {
        self.per
    }

    /// Tokens added per second.
    fn refill_rate(&self) -> f64 {
        f64::from(self.rate) / self.per.as_secs_f64()
    }

    /// Pause between two failed admission attempts (`per / rate`).
    fn retry_interval(&self) -> Duration {
        self.per / self.rate
    }

    /// Wait until a token is available, then take it.
    ///
    /// Only the calling task is suspended while waiting.
    pub async fn acquire(&self) {
        loop {
            {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
            }
            let wait = self.retry_interval();
            trace!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            sleep(wait).await;
        }
    }

    /// Take a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Current token count after refilling.
    pub async fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate()).min(f64::from(self.rate));
        state.last_refill = now;
    }
}
