//! Bounded exponential backoff around single export attempts.

use crate::config::TelemetryConfig;
use crate::error::ExportError;
use std::cmp;
use std::future::Future;
use std::time::Duration;

/// How failed exports are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub attempts: u32,
    /// Limit on each individual attempt.
    pub timeout: Duration,
    /// Step added to the doubled delay before each retry.
    pub step: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the pipeline configuration.
    #[must_use]
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            timeout: config.export_timeout,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            timeout: Duration::from_secs(10),
            step: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Delay sequence `step, 3*step, 7*step, ...` capped at `max`.
#[derive(Debug)]
struct Backoff {
    current: Duration,
    step: Duration,
    max: Duration,
}

impl Backoff {
    fn new(step: Duration, max: Duration) -> Self {
        Self {
            current: Duration::ZERO,
            step,
            max,
        }
    }

    fn next(&mut self) -> Duration {
        self.current = cmp::min(self.current * 2 + self.step, self.max);
        self.current
    }
}

/// Result of an export with retries.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub result: Result<(), ExportError>,
    pub retries: u32,
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. Each attempt is bounded by the policy timeout.
pub(crate) async fn export_with_retry<F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Outcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ExportError>>,
{
    let mut backoff = Backoff::new(policy.step, policy.max_delay);
    let mut retries = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(ExportError::Timeout(policy.timeout)),
        };
        match result {
            Ok(()) => {
                return Outcome {
                    result: Ok(()),
                    retries,
                }
            }
            Err(err) if err.is_retryable() && retries < policy.attempts => {
                retries += 1;
                let delay = backoff.next();
                tracing::debug!(error = %err, retry = retries, ?delay, "Export failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Outcome {
                    result: Err(err),
                    retries,
                }
            }
        }
    }
}
