//! Paired (two-leg) spread position record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::PositionStatus;
use crate::domain::order_execution::OrderFill;
use crate::domain::shared::{BrokerOrderId, DomainError, PositionId, Symbol};

/// One side of a spread.
///
/// A leg with an empty symbol is not applicable: it is never submitted,
/// reconciled, or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairLeg {
    /// Instrument for this leg (empty when absent).
    pub symbol: Symbol,
    /// Entry order at the broker.
    pub order_id: Option<BrokerOrderId>,
    /// Filled entry quantity; the close reuses it.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Option<Decimal>,
    /// Exit order at the broker.
    pub exit_order_id: Option<BrokerOrderId>,
    /// Average exit price.
    pub exit_price: Option<Decimal>,
    /// Quantity filled by the exit order.
    pub exit_quantity: Option<Decimal>,
}

impl PairLeg {
    /// A leg that is not part of this trade.
    #[must_use]
    pub fn absent() -> Self {
        Self::from_entry(Symbol::new(""), None)
    }

    /// Build a leg from its entry fill (or an absent leg when `fill` is `None`).
    #[must_use]
    pub fn from_entry(symbol: Symbol, fill: Option<&OrderFill>) -> Self {
        Self {
            symbol,
            order_id: fill.map(|f| f.broker_order_id.clone()),
            quantity: fill.map_or(Decimal::ZERO, |f| f.filled_quantity),
            entry_price: fill.and_then(OrderFill::price),
            exit_order_id: None,
            exit_price: None,
            exit_quantity: None,
        }
    }

    /// True when this leg names an instrument.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        !self.symbol.is_empty()
    }

    /// True once an exit fill has been recorded.
    #[must_use]
    pub const fn is_exited(&self) -> bool {
        self.exit_order_id.is_some()
    }

    /// True if the leg was entered and still has to be flattened.
    #[must_use]
    pub fn needs_exit(&self) -> bool {
        self.is_applicable()
            && self.order_id.is_some()
            && self.quantity > Decimal::ZERO
            && !self.is_exited()
    }
}

/// Exit data for one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegExit {
    /// Exit order at the broker.
    pub order_id: BrokerOrderId,
    /// Average exit price.
    pub price: Decimal,
    /// Filled exit quantity.
    pub quantity: Decimal,
}

impl LegExit {
    /// Build from a resolved exit fill; `None` if the fill has no price.
    #[must_use]
    pub fn from_fill(fill: &OrderFill) -> Option<Self> {
        fill.price().map(|price| Self {
            order_id: fill.broker_order_id.clone(),
            price,
            quantity: fill.filled_quantity,
        })
    }
}

/// Exit data for a whole pair. Absent legs carry `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairExit {
    /// Sell-leg exit (bought back).
    pub sell_leg: Option<LegExit>,
    /// Buy-leg exit (sold).
    pub buy_leg: Option<LegExit>,
    /// Exit time.
    pub exit_at: DateTime<Utc>,
}

/// A spread trade persisted as one logical position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedPosition {
    /// Store identifier.
    pub id: PositionId,
    /// Strategy name from the signal.
    pub strategy: String,
    /// Free-text reason from the signal.
    pub reason: String,
    /// Leg sold to open.
    pub sell_leg: PairLeg,
    /// Leg bought to open.
    pub buy_leg: PairLeg,
    /// Open or closed.
    pub status: PositionStatus,
    /// Entry time.
    pub entry_at: DateTime<Utc>,
    /// Exit time once closed.
    pub exit_at: Option<DateTime<Utc>>,
}

impl PairedPosition {
    /// Create an open pair.
    #[must_use]
    pub fn open(
        strategy: impl Into<String>,
        reason: impl Into<String>,
        sell_leg: PairLeg,
        buy_leg: PairLeg,
        entry_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PositionId::generate(),
            strategy: strategy.into(),
            reason: reason.into(),
            sell_leg,
            buy_leg,
            status: PositionStatus::Open,
            entry_at,
            exit_at: None,
        }
    }

    /// True while the pair is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Stamp exits and move open -> closed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the pair is already closed.
    pub fn close(&mut self, exit: PairExit) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::InvalidStateTransition {
                entity: "PairedPosition".to_string(),
                from: self.status.to_string(),
                to: PositionStatus::Closed.to_string(),
            });
        }
        apply_leg_exit(&mut self.sell_leg, exit.sell_leg);
        apply_leg_exit(&mut self.buy_leg, exit.buy_leg);
        self.exit_at = Some(exit.exit_at);
        self.status = PositionStatus::Closed;
        Ok(())
    }

    /// Record exits for some legs while the pair stays open.
    ///
    /// # Errors
    ///
    /// Returns error if the pair is already closed.
    pub fn record_leg_exits(&mut self, exit: PairExit) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::InvalidStateTransition {
                entity: "PairedPosition".to_string(),
                from: self.status.to_string(),
                to: self.status.to_string(),
            });
        }
        apply_leg_exit(&mut self.sell_leg, exit.sell_leg);
        apply_leg_exit(&mut self.buy_leg, exit.buy_leg);
        Ok(())
    }

    /// True if no entered leg is still waiting to be flattened.
    #[must_use]
    pub fn all_legs_exited(&self) -> bool {
        !self.sell_leg.needs_exit() && !self.buy_leg.needs_exit()
    }

    /// True if either leg trades `symbol`.
    #[must_use]
    pub fn has_leg(&self, symbol: &Symbol) -> bool {
        (self.sell_leg.is_applicable() && &self.sell_leg.symbol == symbol)
            || (self.buy_leg.is_applicable() && &self.buy_leg.symbol == symbol)
    }
}

fn apply_leg_exit(leg: &mut PairLeg, exit: Option<LegExit>) {
    if let Some(exit) = exit {
        leg.exit_order_id = Some(exit.order_id);
        leg.exit_price = Some(exit.price);
        leg.exit_quantity = Some(exit.quantity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(symbol: &str) -> PairLeg {
        PairLeg {
            symbol: Symbol::new(symbol),
            order_id: Some(BrokerOrderId::new(format!("{symbol}-open"))),
            quantity: dec!(1),
            entry_price: Some(dec!(2.5)),
            exit_order_id: None,
            exit_price: None,
            exit_quantity: None,
        }
    }

    #[test]
    fn absent_leg_is_not_applicable() {
        assert!(!PairLeg::absent().is_applicable());
        assert!(leg("SPY240621C00450000").is_applicable());
    }

    #[test]
    fn closes_exactly_once() {
        let mut pair = PairedPosition::open(
            "iron",
            "signal",
            leg("SPY240621C00450000"),
            PairLeg::absent(),
            Utc::now(),
        );
        let exit = PairExit {
            sell_leg: Some(LegExit {
                order_id: BrokerOrderId::new("x"),
                price: dec!(1.2),
                quantity: dec!(1),
            }),
            buy_leg: None,
            exit_at: Utc::now(),
        };

        pair.close(exit.clone()).unwrap();
        assert_eq!(pair.status, PositionStatus::Closed);
        assert_eq!(pair.sell_leg.exit_price, Some(dec!(1.2)));
        assert_eq!(pair.buy_leg.exit_price, None);

        assert!(pair.close(exit).is_err());
    }

    #[test]
    fn partial_exit_keeps_pair_open() {
        let mut pair = PairedPosition::open(
            "iron",
            "signal",
            leg("SPY240621C00450000"),
            leg("SPY240621C00455000"),
            Utc::now(),
        );
        pair.record_leg_exits(PairExit {
            sell_leg: Some(LegExit {
                order_id: BrokerOrderId::new("x"),
                price: dec!(1.2),
                quantity: dec!(1),
            }),
            buy_leg: None,
            exit_at: Utc::now(),
        })
        .unwrap();

        assert!(pair.is_open());
        assert!(pair.sell_leg.is_exited());
        assert!(pair.buy_leg.needs_exit());
        assert!(!pair.all_legs_exited());
        assert!(pair.has_leg(&Symbol::new("SPY240621C00455000")));
        assert!(!pair.has_leg(&Symbol::new("QQQ")));
    }
}
