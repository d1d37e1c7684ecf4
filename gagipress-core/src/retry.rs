use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ErrorKind};

/// Bounded exponential backoff. Attempts are zero-indexed, so the wait after
/// attempt `n` is `initial_wait * multiplier^n`, capped at `max_wait`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RetrySection")]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_wait: Duration,
    max_wait: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_wait: Duration,
        max_wait: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_wait,
            max_wait,
            multiplier: if multiplier.is_finite() && multiplier > 0.0 {
                multiplier
            } else {
                1.0
            },
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let scaled = self.initial_wait.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_wait.as_secs_f64() {
            self.max_wait
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_wait_ms() -> u64 {
    1_000
}

fn default_max_wait_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl From<RetrySection> for RetryPolicy {
    fn from(section: RetrySection) -> Self {
        RetryPolicy::new(
            section.max_attempts,
            Duration::from_millis(section.initial_wait_ms),
            Duration::from_millis(section.max_wait_ms),
            section.multiplier,
        )
    }
}

/// Runs `operation` until it succeeds, fails with a validation error, or the
/// policy runs out of attempts.
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    retry_if(policy, cancel, |_| true, operation).await
}

/// Like [`retry`], with an extra eligibility check. Validation errors are
/// never retried regardless of what `should_retry` says.
///
/// The operation always runs at least once. Cancellation is only observed
/// while waiting between attempts.
pub async fn retry_if<F, Fut, T, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut should_retry: P,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
    P: FnMut(&AppError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if error.is_kind(ErrorKind::Validation) || !should_retry(&error) {
            return Err(error);
        }
        if attempt + 1 >= policy.max_attempts() {
            debug!(attempts = attempt + 1, error = %error, "retry budget exhausted");
            return Err(error);
        }

        let wait = policy.backoff(attempt);
        warn!(
            attempt = attempt + 1,
            max_attempts = policy.max_attempts(),
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "attempt failed, backing off"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::cancelled()),
            _ = sleep(wait) => {}
        }
        attempt += 1;
    }
}
