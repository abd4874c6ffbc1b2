//! Order intent: what the engine asks the broker to do.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderSide, OrderType, TimeInForce};
use crate::domain::shared::{ClientOrderId, DomainError, Symbol};

/// A single broker order request.
///
/// Constructed per broker call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Client order ID sent with the submission.
    pub client_order_id: ClientOrderId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Quantity (shares or contracts).
    pub quantity: Decimal,
    /// Order type.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Stop trigger price (stop orders only).
    pub stop_price: Option<Decimal>,
}

impl OrderIntent {
    /// Create a day market order.
    #[must_use]
    pub fn market(symbol: Symbol, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            client_order_id: ClientOrderId::generate(),
            symbol,
            side,
            quantity,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            stop_price: None,
        }
    }

    /// Create a good-till-canceled stop order.
    #[must_use]
    pub fn stop(symbol: Symbol, side: OrderSide, quantity: Decimal, stop_price: Decimal) -> Self {
        Self {
            client_order_id: ClientOrderId::generate(),
            symbol,
            side,
            quantity,
            order_type: OrderType::Stop,
            time_in_force: TimeInForce::Gtc,
            stop_price: Some(stop_price),
        }
    }

    /// Set time in force.
    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Set a readable client order id prefix, keeping it unique per submission.
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.client_order_id = ClientOrderId::new(format!("{tag}-{}", &suffix[..12]));
        self
    }

    /// Validate the intent before it reaches the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol is invalid, the quantity is not positive,
    /// or a stop order has no positive stop price.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.symbol.validate()?;
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::invalid("quantity", "must be positive"));
        }
        if self.order_type.requires_stop_price()
            && !self.stop_price.is_some_and(|p| p > Decimal::ZERO)
        {
            return Err(DomainError::invalid(
                "stop_price",
                "stop orders require a positive stop price",
            ));
        }
        Ok(())
    }
}
