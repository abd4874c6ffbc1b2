//! Protective order currently working for a position.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProtectiveLevels;
use crate::domain::shared::{BrokerOrderId, Symbol};

/// The one protective order allowed per open single-leg position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectiveOrderState {
    /// Symbol being protected.
    pub symbol: Symbol,
    /// Working stop order at the broker, if one was placed.
    pub active_order_id: Option<BrokerOrderId>,
    /// Stop trigger price of the working order.
    pub stop_price: Decimal,
    /// Advisory take-profit price.
    pub take_profit_price: Decimal,
    /// When the order was armed.
    pub armed_at: DateTime<Utc>,
}

impl ProtectiveOrderState {
    /// Record a freshly armed stop.
    #[must_use]
    pub fn armed(
        symbol: Symbol,
        order_id: Option<BrokerOrderId>,
        levels: ProtectiveLevels,
        armed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            active_order_id: order_id,
            stop_price: levels.stop_loss,
            take_profit_price: levels.take_profit,
            armed_at,
        }
    }
}
