//! Adaptive backoff delay controller.
//!
//! Converts a stream of success/throttle events into a scalar sleep
//! duration bounded by `[delay_min, delay_max]`. The controller is owned
//! exclusively by one queue's consumer loop, so its arithmetic needs no
//! synchronization.
//!
//! # Invariants
//!
//! - The delay is always `0`, exactly `delay_min`, or a doubling within
//!   `[delay_min, delay_max]`
//! - Recovery steps down by halves rather than snapping to zero, so a
//!   queue that was recently throttled does not immediately re-trigger
//!   the limit

use std::time::Duration;

use tracing::debug;

/// Default floor for a non-zero delay.
pub const DEFAULT_DELAY_MIN: Duration = Duration::from_millis(250);

/// Default ceiling for the delay.
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_secs(30);

/// Deterministic exponential backoff state machine.
///
/// No jitter is applied. The owning queue already serializes calls, so
/// there is no thundering herd to spread out.
#[derive(Debug, Clone)]
pub struct BackoffController {
    delay: Duration,
    delay_min: Duration,
    delay_max: Duration,
}

impl Default for BackoffController {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_MIN, DEFAULT_DELAY_MAX)
    }
}

impl BackoffController {
    /// Create a controller with the given bounds. The delay starts at zero.
    pub fn new(delay_min: Duration, delay_max: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            delay_min,
            delay_max,
        }
    }

    /// The current delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a completed call (success or a non-throttle error) and
    /// return the decayed delay.
    ///
    /// A delay sitting at `delay_min` drops straight to zero; anything
    /// higher is halved, clamped up to `delay_min`.
    pub fn on_success(&mut self) -> Duration {
        if self.delay.is_zero() {
            return self.delay;
        }

        self.delay = if self.delay == self.delay_min {
            Duration::ZERO
        } else {
            (self.delay / 2).max(self.delay_min)
        };

        debug!(delay_ms = self.delay.as_millis() as u64, "backoff decayed");
        self.delay
    }

    /// Record a throttled call and return the raised delay.
    ///
    /// A zero delay jumps to `delay_min`; anything higher doubles, clamped
    /// to `delay_max`.
    pub fn on_throttle(&mut self) -> Duration {
        self.delay = if self.delay.is_zero() {
            self.delay_min
        } else {
            (self.delay * 2).min(self.delay_max)
        };

        debug!(delay_ms = self.delay.as_millis() as u64, "backoff raised");
        self.delay
    }
}
