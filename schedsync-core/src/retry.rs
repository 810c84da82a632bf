//! Retry with exponential backoff and jitter.
//!
//! The policy knows nothing about providers: callers hand [`retry`] an async
//! closure and the error type decides what is worth another attempt through
//! [`Retryable`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::cancel::CancelToken;
use crate::error::Retryable;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of each delay that is randomized, in `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    /// Policy that tries exactly once.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Un-jittered delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Backoff with jitter applied. Never exceeds the un-jittered value.
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return backoff;
        }
        let factor = 1.0 - jitter * rand::thread_rng().gen_range(0.0..1.0);
        backoff.mul_f64(factor)
    }
}

/// Result of a retried call together with the number of attempts made.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, runs out of attempts or
/// the run is cancelled while waiting to retry.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> RetryOutcome<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => err,
        };

        if !err.is_transient() || attempt >= max_attempts || cancel.is_cancelled() {
            return RetryOutcome {
                result: Err(err),
                attempts: attempt,
            };
        }

        let mut delay = policy.delay(attempt);
        if let Some(hint) = err.retry_after() {
            delay = delay.max(hint);
        }

        tracing::debug!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient failure, retrying"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }

        attempt += 1;
    }
}
