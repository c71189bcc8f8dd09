// Whole-workflow retry with exponential backoff

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::error::WorkflowError;
use crate::config::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS};

/// Reruns a fallible operation from scratch until it succeeds or the attempt
/// budget is spent.
///
/// Attempt `n` (1-indexed) that fails is followed by a pause of
/// `base_delay * 2^(n-1)`. No pause follows the last attempt.
#[derive(Debug, Clone)]
pub struct RetryWrapper {
    max_retries: u32,
    base_delay: Duration,
    cancel: CancellationToken,
}

impl RetryWrapper {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Pause after failed attempt `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(2u32.pow(exponent))
    }

    /// Run `operation` with the attempt number (starting at 1) until it
    /// succeeds. Non-retryable errors are returned as-is; otherwise the last
    /// failure is wrapped in `RetriesExhausted`.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, WorkflowError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                return Err(WorkflowError::Cancelled);
            }

            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= self.max_retries {
                tracing::error!(
                    attempts = attempt,
                    error = %error,
                    "Max retries reached; giving up"
                );
                return Err(WorkflowError::RetriesExhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                "Attempt {}/{} failed ({}), retrying in {:?}",
                attempt,
                self.max_retries,
                error,
                delay
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(WorkflowError::Cancelled),
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

impl Default for RetryWrapper {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}
