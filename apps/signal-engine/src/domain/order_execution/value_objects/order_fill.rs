//! Broker order reports and resolved fills.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderSide, OrderStatus};
use crate::domain::shared::{BrokerOrderId, Symbol};

/// Broker's view of one order, as returned by order lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReport {
    /// Broker order ID.
    pub broker_order_id: BrokerOrderId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Current status.
    pub status: OrderStatus,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Quantity filled so far.
    pub filled_quantity: Decimal,
    /// Average fill price, once any quantity has filled.
    pub filled_avg_price: Option<Decimal>,
    /// Time of the (last) fill.
    pub filled_at: Option<DateTime<Utc>>,
}

/// Terminal outcome of fill reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// Filled with a known average price.
    Filled,
    /// Rejected by the broker.
    Rejected,
    /// Canceled or expired before filling.
    Canceled,
    /// No terminal fill observed within the polling budget.
    TimedOut,
}

impl std::fmt::Display for FillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filled => write!(f, "filled"),
            Self::Rejected => write!(f, "rejected"),
            Self::Canceled => write!(f, "canceled"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Reconciled result of one submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFill {
    /// Broker order ID.
    pub broker_order_id: BrokerOrderId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Quantity requested at submission.
    pub requested_quantity: Decimal,
    /// Quantity the broker reports filled.
    pub filled_quantity: Decimal,
    /// Average fill price; always present when `status` is `Filled`.
    pub filled_average_price: Option<Decimal>,
    /// Fill timestamp.
    pub filled_at: Option<DateTime<Utc>>,
    /// Terminal status.
    pub status: FillStatus,
}

impl OrderFill {
    /// Classify a broker report.
    ///
    /// Only a `filled` report carrying an average price counts as filled.
    /// A still-working report is classified as `TimedOut`; callers decide
    /// whether to keep polling.
    #[must_use]
    pub fn from_report(report: &OrderReport, requested_quantity: Decimal) -> Self {
        let status = match report.status {
            OrderStatus::Filled if report.filled_avg_price.is_some() => FillStatus::Filled,
            OrderStatus::Rejected => FillStatus::Rejected,
            OrderStatus::Canceled | OrderStatus::Expired => FillStatus::Canceled,
            _ => FillStatus::TimedOut,
        };
        Self {
            broker_order_id: report.broker_order_id.clone(),
            symbol: report.symbol.clone(),
            side: report.side,
            requested_quantity,
            filled_quantity: report.filled_quantity,
            filled_average_price: report.filled_avg_price,
            filled_at: report.filled_at,
            status,
        }
    }

    /// A fill that never showed up at the broker.
    #[must_use]
    pub fn timed_out(
        broker_order_id: BrokerOrderId,
        symbol: Symbol,
        side: OrderSide,
        requested_quantity: Decimal,
    ) -> Self {
        Self {
            broker_order_id,
            symbol,
            side,
            requested_quantity,
            filled_quantity: Decimal::ZERO,
            filled_average_price: None,
            filled_at: None,
            status: FillStatus::TimedOut,
        }
    }

    /// Fill price, if the order resolved as filled.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        match self.status {
            FillStatus::Filled => self.filled_average_price,
            _ => None,
        }
    }

    /// True if the fill can no longer change.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        !matches!(self.status, FillStatus::TimedOut)
    }
}
