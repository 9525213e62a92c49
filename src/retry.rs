//! Bounded retry for external calls
//!
//! Navigation and summarization each carry their own [`RetryPolicy`]; the
//! policy is independent of the pipeline-wide timeout, which still bounds the
//! total time spent across all attempts.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ScrapeError, ScrapeResult};

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retry.
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Single best-effort attempt
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before attempt number `attempt` (1-based; attempt 1 has no delay)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 1_000, 10_000)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. The last error is returned.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> ScrapeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScrapeResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let delay = policy.delay_for(attempt);
        if !delay.is_zero() {
            debug!(operation = operation_name, attempt, ?delay, "Backing off before retry");
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_retryable() => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Retryable failure"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wrap a future with a timeout that maps expiry into [`ScrapeError::Timeout`]
pub async fn with_timeout<F, T>(operation: F, timeout_secs: u64, operation_name: &str) -> ScrapeResult<T>
where
    F: Future<Output = ScrapeResult<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout {
            operation: operation_name.to_string(),
            secs: timeout_secs,
        }),
    }
}
