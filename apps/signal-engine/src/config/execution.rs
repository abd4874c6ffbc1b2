//! Retry, fill polling, and protective order settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::ExecutionPolicy;
use crate::application::services::{CancelFailurePolicy, FillPollPolicy, RetryPolicy};

/// Broker-call retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Exponential growth factor.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Jitter as a fraction of the delay.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    /// Wall-clock bound on one retry loop in milliseconds.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl RetryConfig {
    /// Convert to the service policy.
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.multiplier,
            jitter_factor: self.jitter_factor,
            deadline: Duration::from_millis(self.deadline_ms),
        }
    }
}

/// Fill polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    /// Wait before the first poll in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Maximum number of polls.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Delay after the first unsuccessful poll in milliseconds.
    #[serde(default = "default_poll_backoff_ms")]
    pub poll_backoff_ms: u64,
    /// Cap on the delay between polls in milliseconds.
    #[serde(default = "default_max_poll_backoff_ms")]
    pub max_poll_backoff_ms: u64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_polls: default_max_polls(),
            poll_backoff_ms: default_poll_backoff_ms(),
            max_poll_backoff_ms: default_max_poll_backoff_ms(),
        }
    }
}

impl FillConfig {
    /// Convert to the service policy.
    #[must_use]
    pub const fn to_policy(&self) -> FillPollPolicy {
        FillPollPolicy {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            max_polls: self.max_polls,
            poll_backoff: Duration::from_millis(self.poll_backoff_ms),
            max_poll_backoff: Duration::from_millis(self.max_poll_backoff_ms),
        }
    }
}

/// Protective order settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtectiveConfig {
    /// What to do when canceling the previous stop fails.
    #[serde(default)]
    pub cancel_failure: CancelFailurePolicy,
}

/// Assemble the execution policy.
#[must_use]
pub const fn execution_policy(
    retry: &RetryConfig,
    fill: &FillConfig,
    protective: &ProtectiveConfig,
) -> ExecutionPolicy {
    ExecutionPolicy {
        retry: retry.to_policy(),
        fill_poll: fill.to_policy(),
        cancel_failure: protective.cancel_failure,
    }
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_initial_backoff_ms() -> u64 {
    250
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

const fn default_deadline_ms() -> u64 {
    30_000
}

const fn default_settle_delay_ms() -> u64 {
    2_000
}

const fn default_max_polls() -> u32 {
    5
}

const fn default_poll_backoff_ms() -> u64 {
    500
}

const fn default_max_poll_backoff_ms() -> u64 {
    4_000
}
