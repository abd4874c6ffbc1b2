//! Product lines with separate broker credentials and kill switches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A product line of the trading account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLine {
    /// Long equities (single-leg signals).
    Equities,
    /// Options (paired spread signals).
    Options,
    /// Short-equity signals.
    ShortEquities,
}

impl ProductLine {
    /// All product lines.
    pub const ALL: [Self; 3] = [Self::Equities, Self::Options, Self::ShortEquities];

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equities => "equities",
            Self::Options => "options",
            Self::ShortEquities => "short_equities",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
