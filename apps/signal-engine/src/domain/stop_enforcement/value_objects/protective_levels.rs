//! Stop-loss and take-profit price levels.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::stop_enforcement::StopEnforcementError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Profit and loss percentages (e.g. `2` means 2%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectiveThresholds {
    /// Take-profit distance above the highest observed price, in percent.
    pub profit_percent: Decimal,
    /// Stop-loss distance below the entry floor, in percent.
    pub loss_percent: Decimal,
}

impl ProtectiveThresholds {
    /// Create thresholds.
    #[must_use]
    pub const fn new(profit_percent: Decimal, loss_percent: Decimal) -> Self {
        Self {
            profit_percent,
            loss_percent,
        }
    }

    /// Validate the percentages.
    ///
    /// # Errors
    ///
    /// Returns error if either percentage is negative or the loss reaches 100%.
    pub fn validate(&self) -> Result<(), StopEnforcementError> {
        if self.profit_percent < Decimal::ZERO {
            return Err(StopEnforcementError::InvalidThresholds {
                message: "profit_percent must not be negative".to_string(),
            });
        }
        if self.loss_percent <= Decimal::ZERO || self.loss_percent >= HUNDRED {
            return Err(StopEnforcementError::InvalidThresholds {
                message: "loss_percent must be between 0 and 100 (exclusive)".to_string(),
            });
        }
        Ok(())
    }
}

/// Computed protective prices, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectiveLevels {
    /// Stop-loss trigger price.
    pub stop_loss: Decimal,
    /// Take-profit price (advisory).
    pub take_profit: Decimal,
}

impl ProtectiveLevels {
    /// Compute levels from the ratcheted entry floor and the highest price seen.
    ///
    /// `stop_loss = entry_floor * (1 - loss/100)` and
    /// `take_profit = highest_price * (1 + profit/100)`, both rounded half away
    /// from zero to two decimals.
    ///
    /// # Errors
    ///
    /// Returns error if the thresholds are invalid or a price is not positive.
    pub fn compute(
        symbol: &str,
        entry_floor: Decimal,
        highest_price: Decimal,
        thresholds: &ProtectiveThresholds,
    ) -> Result<Self, StopEnforcementError> {
        thresholds.validate()?;
        for price in [entry_floor, highest_price] {
            if price <= Decimal::ZERO {
                return Err(StopEnforcementError::InvalidPrice {
                    symbol: symbol.to_string(),
                    price: price.to_string(),
                });
            }
        }

        let stop_loss = round_cents(entry_floor * (Decimal::ONE - thresholds.loss_percent / HUNDRED));
        let take_profit =
            round_cents(highest_price * (Decimal::ONE + thresholds.profit_percent / HUNDRED));

        Ok(Self {
            stop_loss,
            take_profit,
        })
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn thresholds() -> ProtectiveThresholds {
        ProtectiveThresholds::new(dec!(2), dec!(0.3))
    }

    #[test_case(dec!(100), dec!(102.00); "round number")]
    #[test_case(dec!(150.5), dec!(153.51); "fractional price")]
    fn take_profit_is_two_percent_above_high(price: Decimal, expected: Decimal) {
        let levels = ProtectiveLevels::compute("AAPL", price, price, &thresholds()).unwrap();
        assert_eq!(levels.take_profit, expected);
    }

    #[test_case(dec!(100), dec!(99.70))]
    #[test_case(dec!(110), dec!(109.67))]
    fn stop_loss_below_floor(floor: Decimal, expected: Decimal) {
        let levels = ProtectiveLevels::compute("AAPL", floor, floor, &thresholds()).unwrap();
        assert_eq!(levels.stop_loss, expected);
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = ProtectiveLevels::compute("AAPL", dec!(0), dec!(10), &thresholds()).unwrap_err();
        assert!(matches!(err, StopEnforcementError::InvalidPrice { .. }));
    }

    #[test]
    fn rejects_full_loss() {
        let t = ProtectiveThresholds::new(dec!(2), dec!(100));
        assert!(t.validate().is_err());
        let t = ProtectiveThresholds::new(dec!(-1), dec!(1));
        assert!(t.validate().is_err());
    }
}
