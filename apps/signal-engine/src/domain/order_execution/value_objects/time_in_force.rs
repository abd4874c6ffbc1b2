//! Time in force for orders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How long an order stays working at the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Valid for the current trading day.
    #[default]
    Day,
    /// Good till canceled.
    Gtc,
}

impl TimeInForce {
    /// Wire representation used by the broker.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
