use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry for a single remote call, with a fixed wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempt_timeout,
        }
    }

    /// Runs `op` until it succeeds or `max_attempts` calls have failed.
    ///
    /// Each call is bounded by `attempt_timeout`; a timeout counts as a failed
    /// attempt. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = anyhow!("{}: no attempts configured", label);

        for attempt in 1..=self.max_attempts {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("timed out after {:?}", self.attempt_timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < self.max_attempts {
                        let delay = self.delay;
                        warn!(
                            call = label,
                            attempt,
                            max = self.max_attempts,
                            ?delay,
                            error = %e,
                            "attempt failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(call = label, attempt, error = %e, "attempts exhausted");
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error.context(format!(
            "{} failed after {} attempts",
            label, self.max_attempts
        )))
    }
}
