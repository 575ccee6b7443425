// ── Fixed-delay retry policy ──
//
// Seed fetches go through a flat retry schedule: a fixed pause between
// attempts, a fixed attempt ceiling, and no backoff growth. Only
// transient failures are retried; permission and data errors surface
// on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::CoreError;

/// How many times an operation is tried in total (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between consecutive attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// A flat retry schedule for fallible async operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that runs the operation exactly once. Used for writes,
    /// which must never be replayed.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Runs `op`, retrying transient failures on the fixed schedule.
    ///
    /// The final error is the one from the last attempt made, whether
    /// that attempt exhausted the schedule or failed permanently.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient failure, retrying after fixed delay"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
