//! Configuration for the dispatcher.

use std::time::Duration;

use crate::backoff::{DEFAULT_DELAY_MAX, DEFAULT_DELAY_MIN};
use crate::retry::RetryPolicy;

/// Default number of worker threads for blocking vendor calls.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

/// Default depth of each named queue's mailbox.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker pool capacity; a hard ceiling on concurrent blocking calls
    /// across every queue and direct call in the process.
    pub pool_capacity: usize,

    /// Mailbox depth of each named call queue.
    pub queue_depth: usize,

    /// Backoff floor for a throttled queue.
    pub delay_min: Duration,

    /// Backoff ceiling for a throttled queue.
    pub delay_max: Duration,

    /// Retry policy for direct (non-queued) calls.
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            delay_min: DEFAULT_DELAY_MIN,
            delay_max: DEFAULT_DELAY_MAX,
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pool_capacity = env_parse("DROVER_POOL_CAPACITY", defaults.pool_capacity);
        let queue_depth = env_parse("DROVER_QUEUE_DEPTH", defaults.queue_depth);

        let delay_min = Duration::from_millis(env_parse(
            "DROVER_DELAY_MIN_MS",
            defaults.delay_min.as_millis() as u64,
        ));
        let delay_max = Duration::from_millis(env_parse(
            "DROVER_DELAY_MAX_MS",
            defaults.delay_max.as_millis() as u64,
        ));

        let retry = RetryPolicy {
            attempts: env_parse("DROVER_RETRY_ATTEMPTS", defaults.retry.attempts),
            delay: Duration::from_millis(env_parse(
                "DROVER_RETRY_DELAY_MS",
                defaults.retry.delay.as_millis() as u64,
            )),
        };

        Self {
            pool_capacity,
            queue_depth,
            delay_min,
            delay_max,
            retry,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
