//! Position value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// Who manages the position's exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Opened and closed by an operator; no protective orders.
    Manual,
    /// Opened by signals; protective stops armed and trailed by the sentinel.
    Auto,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Persisted position status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    /// Entry filled, exit pending.
    Open,
    /// Exit filled (or forced). Final.
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Lifecycle of a paired position.
///
/// ```text
/// NONE -> OPENING -> OPEN -> CLOSING -> CLOSED
///            |                  |
///            +-> NONE           +-> OPEN      (leg failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairState {
    /// Nothing submitted.
    None,
    /// Entry legs submitted, fills pending.
    Opening,
    /// Both applicable legs filled and recorded.
    Open,
    /// Exit legs submitted, fills pending.
    Closing,
    /// Exit recorded. Final.
    Closed,
}

impl PairState {
    /// Returns true if `next` is a legal successor.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::Opening)
                | (Self::Opening, Self::Open | Self::None)
                | (Self::Open, Self::Closing)
                | (Self::Closing, Self::Closed | Self::Open)
        )
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` for illegal moves, including any move
    /// out of `Closed`.
    pub fn transition(self, next: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidStateTransition {
                entity: "PairedPosition".to_string(),
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl From<PositionStatus> for PairState {
    fn from(status: PositionStatus) -> Self {
        match status {
            PositionStatus::Open => Self::Open,
            PositionStatus::Closed => Self::Closed,
        }
    }
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Opening => write!(f, "OPENING"),
            Self::Open => write!(f, "OPEN"),
            Self::Closing => write!(f, "CLOSING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}
