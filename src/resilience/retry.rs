//! Bounded exponential-backoff retry for remote operations
//!
//! Transient errors (rate limits, network faults, 502/503) are retried with
//! delays of `base × 2^attempt`. Permanent errors fail immediately.

use super::Categorize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Default maximum retry attempts after the first try
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (in milliseconds)
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay to wait after the given zero-based failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Total number of attempts, including the first
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Run `operation`, retrying transient failures with exponential backoff
///
/// Returns the first success, the first permanent error, or the last
/// transient error once retries are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Categorize + fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.categorize().is_transient() {
            error!("Permanent error detected, failing immediately: {}", err);
            return Err(err);
        }

        if attempt >= policy.max_retries {
            error!("Max retries ({}) exhausted: {}", policy.max_retries, err);
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Transient error (attempt {}/{}): {}",
            attempt + 1,
            policy.total_attempts(),
            err
        );
        warn!("Retrying in {}ms...", delay.as_millis());

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
