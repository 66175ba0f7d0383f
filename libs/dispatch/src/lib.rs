//! # drover-dispatch
//!
//! Serialized, rate-limit-aware dispatch of blocking vendor API calls.
//!
//! ## Design Principles
//!
//! - At most one call is in flight per named queue, in FIFO submission order
//! - Throttle errors are retried indefinitely behind an adaptive backoff
//!   delay and are never visible to the caller
//! - Any other error propagates to the caller unchanged, without retry
//! - Blocking SDK calls run on a bounded worker pool so they never stall
//!   the cooperative scheduler
//!
//! ## Components
//!
//! - [`BackoffController`] — deterministic exponential delay state machine
//! - [`BlockingPool`] — bounded `spawn_blocking` wrapper, shared process-wide
//! - [`CallQueue`] — one FIFO queue + single consumer loop per resource name
//! - [`Dispatcher`] — long-lived registry of named queues plus a direct
//!   (unordered) call path with bounded retry
//! - [`ApiError`] — the two recognized vendor error shapes, throttle
//!   classification, and pass-through for everything else

mod backoff;
mod config;
mod dispatcher;
mod error;
mod pool;
mod queue;
mod retry;

pub use backoff::BackoffController;
pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::{ApiError, THROTTLE_CODES};
pub use pool::BlockingPool;
pub use queue::CallQueue;
pub use retry::{with_retries, RetryPolicy};
