//! Bounded exponential backoff and per-call timeouts for upstream calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RagError, Result};

/// Backoff schedule for transient upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, ..Self::default() }
    }

    /// Delay after the given zero-based failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation`, retrying only errors for which [`RagError::is_transient`] holds.
///
/// Non-transient errors (malformed input, consistency, configuration) are
/// returned immediately.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run `operation`, retrying it once after `delay` if it fails with
/// [`RagError::UpstreamTimeout`]. A second timeout is returned to the caller.
pub async fn retry_once_on_timeout<F, Fut, T>(delay: Duration, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Err(RagError::UpstreamTimeout { operation: name, timeout }) => {
            warn!(operation = %name, timeout_ms = timeout.as_millis() as u64, "upstream timeout, retrying once");
            tokio::time::sleep(delay).await;
            operation().await
        }
        other => other,
    }
}

/// Run `future` under a time budget, mapping expiry to [`RagError::UpstreamTimeout`].
pub async fn with_timeout<Fut, T>(operation_name: &str, budget: Duration, future: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, future).await {
        Ok(result) => result,
        Err(_) => Err(RagError::UpstreamTimeout { operation: operation_name.to_string(), timeout: budget }),
    }
}
