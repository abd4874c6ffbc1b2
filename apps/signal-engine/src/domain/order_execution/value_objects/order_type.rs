//! Order type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type supported by the engine.
///
/// Entries and exits are market orders; protective exits are stop orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Market order - execute at best available price.
    Market,
    /// Stop order - becomes a market order once the stop price trades.
    Stop,
}

impl OrderType {
    /// Wire representation used by the broker.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Stop => "stop",
        }
    }

    /// Returns true if this order type requires a stop price.
    #[must_use]
    pub const fn requires_stop_price(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
