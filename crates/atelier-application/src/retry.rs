//! Retry policy for generation calls.
//!
//! Rate-limit failures are retried with linear backoff
//! (`initial_delay * attempt`); every other failure is surfaced at once.

use atelier_core::config::RetryConfig;
use atelier_core::generation::GenerationError;
use std::future::Future;
use std::time::Duration;

/// Bounded retry with linear backoff, shared by every external call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Wait applied after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay * attempt
    }

    /// Runs `operation` until it succeeds, fails with a non-rate-limit error,
    /// or exhausts `max_attempts`.
    ///
    /// `label` names the call site in log output.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        call = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Rate limited; will retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_rate_limited() {
                        tracing::warn!(call = label, attempt, "Rate limit persisted; giving up");
                    } else {
                        tracing::debug!(call = label, attempt, error = %err, "Call failed without retry");
                    }
                    return Err(err);
                }
            }
        }
    }
}
