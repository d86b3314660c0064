//! # Retry With Backoff
//!
//! Generic wrapper that re-runs a failing async operation with exponential
//! backoff and jitter. The delay before retry `n` (zero based) is
//! `min(base * multiplier^n + jitter, max_delay)`.
//!
//! Errors opt in to retrying through [`Retryable`]; a non-retryable error
//! (a 4xx rejection, a circuit that is already open) is returned at once.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Classification used by [`retry_with_backoff`]
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Backoff policy for short-lived network retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Exponential multiplier (default: 2.0)
    pub multiplier: f64,
    pub jitter_enabled: bool,
    /// Maximum jitter as a fraction of the computed delay (0.0 to 1.0)
    pub max_jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
            jitter_enabled: true,
            max_jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Deterministic part of the delay before retry `attempt`
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(exponential.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retry `attempt`, jitter included and capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        if !self.jitter_enabled || self.max_jitter <= 0.0 {
            return base;
        }
        let jitter_ceiling = base.as_secs_f64() * self.max_jitter;
        let jitter = if jitter_ceiling > 0.0 {
            rand::thread_rng().gen_range(0.0..=jitter_ceiling)
        } else {
            0.0
        };
        Duration::from_secs_f64((base.as_secs_f64() + jitter).min(self.max_delay.as_secs_f64()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if self.multiplier < 1.0 {
            return Err("multiplier must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.max_jitter) {
            return Err("max_jitter must be between 0.0 and 1.0".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err("base_delay must not exceed max_delay".to_string());
        }
        Ok(())
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "🔁 Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!(
                    operation = operation_name,
                    error = %err,
                    "Non-retryable error, giving up"
                );
                return Err(err);
            }
            Err(err) if attempt + 1 >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %err,
                    "❌ Retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "⏳ Retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
