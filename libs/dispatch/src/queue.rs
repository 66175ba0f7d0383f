//! Serialized call queue.
//!
//! One FIFO mailbox and one consumer loop per resource name. The consumer
//! runs exactly one call at a time on the worker pool, which is the
//! ordering guarantee this module exists to provide: a call that arrives
//! while another is executing (or backing off) waits its turn, so
//! concurrent retries can never amplify a rate-limit storm.
//!
//! Throttled calls are retried indefinitely behind the backoff delay and
//! are invisible to the caller. A capped retry would surface user-visible
//! failures for what is, in practice, a transient limit.

use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::backoff::BackoffController;
use crate::error::ApiError;
use crate::pool::BlockingPool;

/// What a single attempt of a queued call produced.
enum Attempt {
    /// The call finished — with a value or a non-throttle error — and the
    /// result has been delivered to the waiting caller.
    Done,

    /// The call hit a rate limit; the result channel is untouched and the
    /// call must be attempted again.
    Throttled,
}

/// A type-erased queued call. The concrete value type lives inside the
/// closure and its reply channel.
trait Job: Send {
    fn attempt(&mut self) -> Attempt;
}

type BoxedJob = Box<dyn Job>;

/// One API invocation request: the thunk plus a single-slot reply channel.
///
/// The thunk captures its own arguments; it is re-invoked on every retry,
/// so it must be `FnMut`.
struct QueuedCall<T, F> {
    thunk: F,
    reply: Option<oneshot::Sender<Result<T, ApiError>>>,
}

impl<T, F> Job for QueuedCall<T, F>
where
    T: Send + 'static,
    F: FnMut() -> Result<T, ApiError> + Send + 'static,
{
    fn attempt(&mut self) -> Attempt {
        let result = (self.thunk)();

        if matches!(&result, Err(e) if e.is_throttle()) {
            return Attempt::Throttled;
        }

        if let Some(reply) = self.reply.take() {
            // The caller may have stopped waiting; nothing to do then.
            let _ = reply.send(result);
        }
        Attempt::Done
    }
}

/// Handle to one named serialized call queue.
///
/// Cloning the handle shares the same mailbox and consumer loop.
#[derive(Clone)]
pub struct CallQueue {
    name: String,
    tx: mpsc::Sender<BoxedJob>,
}

impl CallQueue {
    /// Spawn a queue's consumer loop and return its handle.
    pub(crate) fn spawn(
        name: String,
        pool: BlockingPool,
        backoff: BackoffController,
        depth: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(depth);

        tokio::spawn(consumer_loop(name.clone(), rx, pool, backoff));

        Self { name, tx }
    }

    /// The queue's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit one blocking call and suspend until the consumer loop has
    /// executed it.
    ///
    /// Returns the thunk's value, or its error for any non-throttle
    /// failure. Throttle errors never reach the caller; the call is
    /// retried behind the queue's backoff delay until it resolves some
    /// other way.
    pub async fn call<T, F>(&self, thunk: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnMut() -> Result<T, ApiError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: BoxedJob = Box::new(QueuedCall {
            thunk,
            reply: Some(reply_tx),
        });

        self.tx
            .send(job)
            .await
            .map_err(|_| ApiError::Dispatch(format!("queue {} is closed", self.name)))?;

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Dispatch(format!(
                "queue {} dropped the call before completion",
                self.name
            ))),
        }
    }
}

/// Single consumer: pops requests in FIFO order and attempts each one
/// until it completes, raising the backoff delay on throttles and decaying
/// it on everything else.
///
/// The backoff state is owned by this loop alone; no other task reads or
/// writes it.
async fn consumer_loop(
    name: String,
    mut rx: mpsc::Receiver<BoxedJob>,
    pool: BlockingPool,
    mut backoff: BackoffController,
) {
    while let Some(received) = rx.recv().await {
        let mut job = received;

        loop {
            // The job moves onto a worker thread and back so the attempt
            // can block without stalling this loop.
            let outcome = pool
                .run(move || {
                    let outcome = job.attempt();
                    (job, outcome)
                })
                .await;

            let (returned, attempt) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    // The job (and its reply channel) died with the worker;
                    // the caller observes a dispatch error.
                    error!(queue = %name, error = %e, "worker pool lost a queued call");
                    break;
                }
            };
            job = returned;

            match attempt {
                Attempt::Throttled => {
                    let delay = backoff.on_throttle();
                    warn!(
                        queue = %name,
                        delay_ms = delay.as_millis() as u64,
                        "call throttled; backing off and retrying"
                    );
                    sleep(delay).await;
                }
                Attempt::Done => {
                    // Decay, then pace the next request by the decayed
                    // amount (usually zero) even when this call failed for
                    // non-throttle reasons.
                    let delay = backoff.on_success();
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    break;
                }
            }
        }
    }

    debug!(queue = %name, "call queue drained");
}
