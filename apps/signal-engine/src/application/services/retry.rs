//! Retry policy with exponential backoff and an overall deadline.
//!
//! Broker adapters never retry; every retry loop in the engine goes through
//! [`retry_broker_call`] so attempt counts and deadlines are uniform.
//!
//! # Retryable Errors
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 429 (Rate Limited) | HTTP 401/403 (Auth Errors) |
//! | HTTP 408 / 5xx | HTTP 404 / 422 (Rejected) |
//! | Network timeouts | Malformed response |

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;

use crate::application::ports::BrokerError;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (default: 10).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 250ms).
    pub initial_backoff: Duration,
    /// Maximum delay between attempts (default: 5s).
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
    /// Wall-clock bound on the whole loop (default: 30s).
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            deadline: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Immediate retries without jitter, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            deadline: Duration::from_secs(5),
        }
    }
}

/// Calculator for exponential backoff with jitter.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    retries_taken: u32,
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Create a calculator from a retry policy.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            retries_taken: 0,
            max_retries: policy.max_attempts.saturating_sub(1),
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Delay before the next retry, or `None` once retries are exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries_taken >= self.max_retries {
            return None;
        }

        let base_ms = self.base_backoff_ms();
        let capped_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);
        self.retries_taken += 1;

        Some(Duration::from_millis(capped_ms))
    }

    fn base_backoff_ms(&self) -> u64 {
        let multiplier = self.backoff_multiplier.powi(self.retries_taken as i32);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    /// Uniform jitter in `[backoff * (1 - j), backoff * (1 + j)]`.
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rand::rng().random_range(min..=max) as u64
    }

    /// Retries taken so far.
    #[must_use]
    pub const fn retries_taken(&self) -> u32 {
        self.retries_taken
    }
}

/// Terminal failure of a retried broker call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    /// Every attempt failed with a retryable error.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Operation label.
        operation: String,
        /// Attempts made.
        attempts: u32,
        /// Last error seen.
        last: BrokerError,
    },

    /// The broker returned a final error.
    #[error("{operation} failed on attempt {attempts}: {error}")]
    NonRetryable {
        /// Operation label.
        operation: String,
        /// Attempts made.
        attempts: u32,
        /// The final error.
        error: BrokerError,
    },

    /// The overall deadline passed.
    #[error("{operation} exceeded its deadline after {attempts} attempts")]
    DeadlineExceeded {
        /// Operation label.
        operation: String,
        /// Attempts made.
        attempts: u32,
    },
}

impl RetryError {
    /// Attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }
}

/// Run `call` under `policy`.
///
/// Retryable errors are retried with backoff; anything else returns at once.
/// Each attempt is also bounded by the policy deadline, so a hung request
/// cannot outlive it. On success returns the value and the attempt count.
pub async fn retry_broker_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<(T, u32), RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BrokerError>>,
{
    let deadline = Instant::now() + policy.deadline;
    let mut backoff = ExponentialBackoffCalculator::new(policy);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout_at(deadline, call(attempt)).await {
            Ok(result) => result,
            Err(_) => {
                return Err(RetryError::DeadlineExceeded {
                    operation: operation.to_string(),
                    attempts: attempt,
                });
            }
        };

        let error = match result {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if !e.is_retryable() => {
                return Err(RetryError::NonRetryable {
                    operation: operation.to_string(),
                    attempts: attempt,
                    error: e,
                });
            }
            Err(e) => e,
        };

        let Some(delay) = backoff.next_backoff() else {
            return Err(RetryError::Exhausted {
                operation: operation.to_string(),
                attempts: attempt,
                last: error,
            });
        };

        if Instant::now() + delay >= deadline {
            return Err(RetryError::DeadlineExceeded {
                operation: operation.to_string(),
                attempts: attempt,
            });
        }

        tracing::warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retryable broker error, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
