//! Bounded worker pool for blocking vendor calls.
//!
//! Vendor SDK calls block their thread, so they are offloaded to tokio's
//! blocking pool behind a semaphore. The semaphore capacity is a hard
//! global ceiling on concurrent blocking calls: every named queue and
//! every direct call in the process draws from the same pool.
//!
//! A task that already started on a worker thread cannot be cancelled; a
//! caller that stops waiting (e.g. on timeout) simply abandons the result.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::ApiError;

/// Bounded pool for running blocking closures off the cooperative
/// scheduler.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    capacity: usize,
    permits: Arc<Semaphore>,
}

impl BlockingPool {
    /// Create a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// The pool's capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run a blocking closure on the pool, suspending until a worker slot
    /// is free and the closure has returned.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Dispatch("worker pool closed".to_string()))?;

        let handle = tokio::task::spawn_blocking(move || {
            let out = f();
            drop(permit);
            out
        });

        handle
            .await
            .map_err(|e| ApiError::Dispatch(format!("worker task failed: {e}")))
    }
}
