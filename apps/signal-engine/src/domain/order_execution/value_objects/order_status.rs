//! Order status as reported by the broker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker order status, collapsed to the states the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Received by the broker, not yet routed.
    New,
    /// Accepted by the broker and working.
    Accepted,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Canceled.
    Canceled,
    /// Rejected by the broker.
    Rejected,
    /// Expired (e.g., Day order at market close).
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if the order can still be canceled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::New | Self::Accepted | Self::PartiallyFilled)
    }

    /// Map a broker status string to an `OrderStatus`.
    ///
    /// Unknown or pre-route statuses map to `New`.
    #[must_use]
    pub fn from_broker(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "accepted" | "accepted_for_bidding" | "replaced" | "pending_replace" => Self::Accepted,
            "partially_filled" => Self::PartiallyFilled,
            "filled" => Self::Filled,
            "done_for_day" | "expired" => Self::Expired,
            "canceled" | "pending_cancel" => Self::Canceled,
            "rejected" => Self::Rejected,
            _ => Self::New,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}
