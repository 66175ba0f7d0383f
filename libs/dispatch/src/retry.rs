//! Bounded retry for direct (non-queued) calls.
//!
//! Direct calls have no shared backoff state, so a throttled attempt is
//! simply retried a fixed number of times with a fixed pause. Resources
//! that throttle often enough for this to matter belong on a serialized
//! queue instead.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::ApiError;

/// Retry policy for direct calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,

    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Whether a failed attempt should be tried again.
    ///
    /// Only throttle-classified errors are retryable; anything else is
    /// the caller's problem immediately.
    pub fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        attempt < self.attempts && error.is_throttle()
    }
}

/// Run an async operation under a retry policy.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if policy.should_retry(attempt, &error) => {
                warn!(
                    attempt,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %error,
                    "call throttled; retrying"
                );
                sleep(policy.delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
