//! Stop Enforcement Errors

use thiserror::Error;

/// Errors raised while computing protective levels.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopEnforcementError {
    /// Profit/loss percentages out of range.
    #[error("Invalid protective thresholds: {message}")]
    InvalidThresholds {
        /// Error details.
        message: String,
    },

    /// Reference price not usable.
    #[error("Invalid reference price {price} for {symbol}")]
    InvalidPrice {
        /// Symbol being protected.
        symbol: String,
        /// Offending price.
        price: String,
    },
}
