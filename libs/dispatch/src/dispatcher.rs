//! Long-lived registry of named call queues.
//!
//! One queue instance exists per logical resource name and is reused for
//! every call against that name. The registry is an explicit object passed
//! by reference to whatever needs to issue calls — never module-level
//! global state — so lifecycle and test isolation stay explicit.
//!
//! Dropping the dispatcher closes every queue's mailbox; consumer loops
//! drain their in-flight work and exit.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::backoff::BackoffController;
use crate::config::DispatchConfig;
use crate::error::ApiError;
use crate::pool::BlockingPool;
use crate::queue::CallQueue;

/// Coordinator for all vendor API calls in the process.
///
/// Holds the shared worker pool and the registry of named serialized
/// queues. Queues are created lazily on first use and never share backoff
/// state with each other.
pub struct Dispatcher {
    config: DispatchConfig,
    pool: BlockingPool,
    queues: Mutex<HashMap<String, CallQueue>>,
}

impl Dispatcher {
    /// Create a dispatcher from configuration.
    pub fn new(config: DispatchConfig) -> Self {
        info!(
            pool_capacity = config.pool_capacity,
            delay_min_ms = config.delay_min.as_millis() as u64,
            delay_max_ms = config.delay_max.as_millis() as u64,
            "dispatcher ready"
        );

        let pool = BlockingPool::new(config.pool_capacity);

        Self {
            config,
            pool,
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// The shared worker pool.
    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    /// Handle to the named queue, creating it on first use.
    pub async fn queue(&self, name: &str) -> CallQueue {
        let mut queues = self.queues.lock().await;

        if let Some(queue) = queues.get(name) {
            return queue.clone();
        }

        debug!(queue = name, "creating serialized call queue");
        let queue = CallQueue::spawn(
            name.to_string(),
            self.pool.clone(),
            BackoffController::new(self.config.delay_min, self.config.delay_max),
            self.config.queue_depth,
        );
        queues.insert(name.to_string(), queue.clone());
        queue
    }

    /// Submit one blocking call to the named serialized queue and suspend
    /// until it completes.
    ///
    /// Calls against the same name execute strictly in submission order;
    /// throttles are absorbed by the queue's backoff loop.
    pub async fn call<T, F>(&self, queue_name: &str, thunk: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnMut() -> Result<T, ApiError> + Send + 'static,
    {
        self.queue(queue_name).await.call(thunk).await
    }

    /// Run one blocking call on the worker pool without queue ordering.
    ///
    /// Throttle-classified errors are retried per the configured
    /// [`RetryPolicy`](crate::RetryPolicy); anything else propagates after
    /// the first attempt. Use a named queue instead for resources that
    /// need strict ordering or shared backoff.
    pub async fn direct<T, F>(&self, thunk: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnMut() -> Result<T, ApiError> + Send + 'static,
    {
        let policy = self.config.retry.clone();
        let mut thunk = thunk;
        let mut attempt = 0;

        loop {
            attempt += 1;

            // The thunk shuttles onto a worker thread and back so the
            // next attempt can re-invoke it.
            let (returned, result) = self
                .pool
                .run(move || {
                    let result = thunk();
                    (thunk, result)
                })
                .await?;
            thunk = returned;

            match result {
                Ok(value) => return Ok(value),
                Err(error) if policy.should_retry(attempt, &error) => {
                    debug!(
                        attempt,
                        delay_ms = policy.delay.as_millis() as u64,
                        "direct call throttled; retrying"
                    );
                    sleep(policy.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_dispatcher() -> Dispatcher {
        Dispatcher::new(DispatchConfig {
            delay_min: Duration::from_millis(10),
            delay_max: Duration::from_millis(80),
            retry: crate::RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(5),
            },
            ..DispatchConfig::default()
        })
    }

    #[tokio::test]
    async fn test_queue_is_reused_per_name() {
        let dispatcher = test_dispatcher();

        let first = dispatcher.queue("elb.describe").await;
        let second = dispatcher.queue("elb.describe").await;
        assert_eq!(first.name(), second.name());

        let queues = dispatcher.queues.lock().await;
        assert_eq!(queues.len(), 1);
    }

    #[tokio::test]
    async fn test_queued_call_round_trip() {
        let dispatcher = test_dispatcher();
        let out = dispatcher
            .call("sqs.create", || Ok::<_, ApiError>("made"))
            .await
            .unwrap();
        assert_eq!(out, "made");
    }

    #[tokio::test]
    async fn test_direct_call_retries_throttle() {
        let dispatcher = test_dispatcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let out = dispatcher
            .direct(move || {
                if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::code("Rate exceeded", "later"))
                } else {
                    Ok(5)
                }
            })
            .await
            .unwrap();

        assert_eq!(out, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_direct_call_does_not_retry_other_errors() {
        let dispatcher = test_dispatcher();
        let calls = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&calls);
        let result: Result<(), ApiError> = dispatcher
            .direct(move || {
                counted.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::code("ValidationError", "bad input"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
