//! Single-leg position record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::{PositionStatus, TradingMode};
use crate::domain::shared::{BrokerOrderId, DomainError, PositionId, Symbol};

/// Data captured from a filled entry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosition {
    /// Symbol held.
    pub symbol: Symbol,
    /// Filled quantity.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Trading mode.
    pub mode: TradingMode,
    /// Entry order at the broker.
    pub broker_order_id: BrokerOrderId,
    /// Fill time.
    pub entry_at: DateTime<Utc>,
}

/// Data captured from a filled exit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionExit {
    /// Average exit price.
    pub exit_price: Decimal,
    /// Exit time.
    pub exit_at: DateTime<Utc>,
}

/// A single-leg position.
///
/// Never deleted; closing only stamps the exit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Store identifier.
    pub id: PositionId,
    /// Symbol held.
    pub symbol: Symbol,
    /// Quantity held.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Average exit price once closed.
    pub exit_price: Option<Decimal>,
    /// Open or closed.
    pub status: PositionStatus,
    /// Manual or auto.
    pub mode: TradingMode,
    /// Entry order at the broker.
    pub broker_order_id: BrokerOrderId,
    /// Entry time.
    pub entry_at: DateTime<Utc>,
    /// Exit time once closed.
    pub exit_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Create an open position from entry data.
    #[must_use]
    pub fn open(entry: NewPosition) -> Self {
        Self {
            id: PositionId::generate(),
            symbol: entry.symbol,
            quantity: entry.quantity,
            entry_price: entry.entry_price,
            exit_price: None,
            status: PositionStatus::Open,
            mode: entry.mode,
            broker_order_id: entry.broker_order_id,
            entry_at: entry.entry_at,
            exit_at: None,
        }
    }

    /// True while the position is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Stamp the exit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the position is already closed.
    pub fn close(&mut self, exit: PositionExit) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::InvalidStateTransition {
                entity: "Position".to_string(),
                from: self.status.to_string(),
                to: PositionStatus::Closed.to_string(),
            });
        }
        self.exit_price = Some(exit.exit_price);
        self.exit_at = Some(exit.exit_at);
        self.status = PositionStatus::Closed;
        Ok(())
    }

    /// Realized profit/loss once closed (long positions).
    #[must_use]
    pub fn realized_pnl(&self) -> Option<Decimal> {
        self.exit_price
            .map(|exit| (exit - self.entry_price) * self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> NewPosition {
        NewPosition {
            symbol: Symbol::new("AAPL"),
            quantity: dec!(10),
            entry_price: dec!(100),
            mode: TradingMode::Auto,
            broker_order_id: BrokerOrderId::new("o-1"),
            entry_at: Utc::now(),
        }
    }

    #[test]
    fn close_once() {
        let mut position = Position::open(entry());
        assert!(position.is_open());

        let exit = PositionExit {
            exit_price: dec!(105),
            exit_at: Utc::now(),
        };
        position.close(exit.clone()).unwrap();
        assert_eq!(position.status, PositionStatus::Closed);
        assert_eq!(position.realized_pnl(), Some(dec!(50)));

        assert!(position.close(exit).is_err());
    }
}
