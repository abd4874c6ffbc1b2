//! Signal handler results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::ProductLine;

/// Outcome category returned by every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The requested trade happened and was recorded.
    Executed,
    /// The product's kill switch is off.
    NotStarted,
    /// Nothing open to act on.
    NotFound,
    /// Already open, already closed, or busy.
    Conflict,
    /// Some legs traded, others did not.
    PartialFailure,
    /// An order was submitted but no priced fill was observed.
    Unreconciled,
    /// The signal was malformed.
    Invalid,
    /// Nothing traded.
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Executed => "executed",
            Self::NotStarted => "not_started",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::PartialFailure => "partial_failure",
            Self::Unreconciled => "unreconciled",
            Self::Invalid => "invalid",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// `{message, outcome}` response of a signal handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Outcome category.
    pub outcome: Outcome,
}

impl SignalOutcome {
    /// Create an outcome.
    pub fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            outcome,
        }
    }

    /// Trade executed.
    pub fn executed(message: impl Into<String>) -> Self {
        Self::new(Outcome::Executed, message)
    }

    /// Kill switch off for `product`.
    #[must_use]
    pub fn not_started(product: ProductLine) -> Self {
        Self::new(
            Outcome::NotStarted,
            format!("{} trading is not started", product.as_str()),
        )
    }

    /// Nothing to act on.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Outcome::NotFound, message)
    }

    /// Conflicting state.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Outcome::Conflict, message)
    }

    /// Malformed signal.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(Outcome::Invalid, message)
    }

    /// Nothing traded.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(Outcome::Failed, message)
    }

    /// True if the trade was executed.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.outcome == Outcome::Executed
    }
}
