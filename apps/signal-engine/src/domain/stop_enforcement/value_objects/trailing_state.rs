//! Per-symbol trailing state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ratcheting price memory for one open position.
///
/// The floor is the entry price raised to every higher price observed since;
/// it never moves down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingState {
    entry_price: Decimal,
    highest_price: Decimal,
    evaluation_count: u64,
}

impl TrailingState {
    /// Start trailing from a fill price.
    #[must_use]
    pub const fn new(entry_price: Decimal) -> Self {
        Self {
            entry_price,
            highest_price: entry_price,
            evaluation_count: 0,
        }
    }

    /// Record an observed price and return the (possibly raised) floor.
    pub fn observe(&mut self, price: Decimal) -> Decimal {
        if price > self.highest_price {
            self.highest_price = price;
        }
        self.evaluation_count += 1;
        self.entry_floor()
    }

    /// Maximum of the entry price and every observed price.
    #[must_use]
    pub fn entry_floor(&self) -> Decimal {
        self.entry_price.max(self.highest_price)
    }

    /// Entry fill price.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Highest observed price (starts at the entry price).
    #[must_use]
    pub const fn highest_price(&self) -> Decimal {
        self.highest_price
    }

    /// Number of observations since entry.
    #[must_use]
    pub const fn evaluation_count(&self) -> u64 {
        self.evaluation_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stop_enforcement::{ProtectiveLevels, ProtectiveThresholds};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stop_ratchets_up_and_holds() {
        let thresholds = ProtectiveThresholds::new(dec!(2), dec!(0.3));
        let mut state = TrailingState::new(dec!(100));

        let stop = |s: &TrailingState| {
            ProtectiveLevels::compute("AAPL", s.entry_floor(), s.highest_price(), &thresholds)
                .unwrap()
                .stop_loss
        };

        assert_eq!(stop(&state), dec!(99.70));
        state.observe(dec!(110));
        assert_eq!(stop(&state), dec!(109.67));
        state.observe(dec!(105));
        assert_eq!(stop(&state), dec!(109.67));
        assert_eq!(state.evaluation_count(), 2);
    }

    proptest! {
        #[test]
        fn floor_never_decreases(prices in proptest::collection::vec(1u32..100_000, 1..50)) {
            let mut state = TrailingState::new(dec!(500));
            let mut last = state.entry_floor();
            for cents in prices {
                let floor = state.observe(Decimal::new(i64::from(cents), 2));
                prop_assert!(floor >= last);
                last = floor;
            }
        }
    }
}
