//! # Retry Module
//!
//! A bounded retry policy with a fixed delay and a fallback value returned
//! once every attempt has failed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retries an operation up to `max_attempts` times, sleeping `delay` after
/// each failure, and yields `fallback` when all attempts fail.
#[derive(Debug, Clone)]
pub struct RetryPolicy<T> {
    pub max_attempts: u32,
    pub delay: Duration,
    pub fallback: T,
}

impl RetryPolicy<bool> {
    /// Two attempts one second apart, answering `true` when both fail.
    pub fn fail_open() -> Self {
        RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_secs(1),
            fallback: true,
        }
    }
}

impl<T: Clone> RetryPolicy<T> {
    pub fn new(max_attempts: u32, delay: Duration, fallback: T) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
            fallback,
        }
    }

    /// Runs `op` until it succeeds or the attempts run out.
    ///
    /// # Arguments
    ///
    /// * `label` - Name of the operation, used in log lines.
    /// * `op` - Produces a fresh future per attempt.
    ///
    /// # Returns
    ///
    /// The first successful value, or a clone of `fallback`.
    pub async fn run<E, F, Fut>(&self, label: &str, mut op: F) -> T
        where E: Display, F: FnMut() -> Fut, Fut: Future<Output = Result<T, E>>
    {
        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => {
                    return value;
                }
                Err(err) => {
                    warn!(operation = label, attempt, max_attempts = self.max_attempts, error = %err, "attempt failed");
                    tokio::time::sleep(self.delay).await;
                }
            }
        }

        warn!(operation = label, "retries exhausted, using fallback");
        self.fallback.clone()
    }
}
