//! Broker Port (Driven Port)
//!
//! Interface for order routing, order lookups, positions, and quotes.
//!
//! Implementations perform exactly one request per call. Retry policy lives
//! in the application services so the retry budget stays visible to callers.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order_execution::{OrderIntent, OrderReport, OrderStatus};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Symbol};

/// Acknowledgment of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker order ID.
    pub broker_order_id: BrokerOrderId,
    /// Client order ID echoed back.
    pub client_order_id: ClientOrderId,
    /// Status at submission time.
    pub status: OrderStatus,
}

/// Status filter for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQueryStatus {
    /// Working orders.
    Open,
    /// Filled, canceled, rejected, or expired orders.
    Closed,
    /// Everything.
    All,
}

impl OrderQueryStatus {
    /// Query value understood by the broker.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Asset class of a broker-reported position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    /// US equity.
    UsEquity,
    /// US listed option.
    UsOption,
    /// Crypto.
    Crypto,
    /// Anything else, verbatim.
    Other(String),
}

impl AssetClass {
    /// Parse the broker's asset class string.
    #[must_use]
    pub fn from_broker(raw: &str) -> Self {
        match raw {
            "us_equity" => Self::UsEquity,
            "us_option" => Self::UsOption,
            "crypto" => Self::Crypto,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A position as the broker sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerPosition {
    /// Symbol.
    pub symbol: Symbol,
    /// Signed quantity: negative for short holdings.
    pub quantity: Decimal,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Average entry price.
    pub avg_entry_price: Decimal,
    /// Last price reported with the position.
    pub current_price: Option<Decimal>,
}

/// Market quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol.
    pub symbol: Symbol,
    /// Best bid price (zero when absent).
    pub bid: Decimal,
    /// Best ask price (zero when absent).
    pub ask: Decimal,
}

impl Quote {
    /// Create a quote.
    #[must_use]
    pub const fn new(symbol: Symbol, bid: Decimal, ask: Decimal) -> Self {
        Self { symbol, bid, ask }
    }

    /// Reference price: mid when both sides are present, otherwise whichever
    /// side is non-zero.
    #[must_use]
    pub fn reference_price(&self) -> Option<Decimal> {
        match (self.bid > Decimal::ZERO, self.ask > Decimal::ZERO) {
            (true, true) => Some((self.bid + self.ask) / Decimal::TWO),
            (true, false) => Some(self.bid),
            (false, true) => Some(self.ask),
            (false, false) => None,
        }
    }
}

/// Broker errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// Transport failure (connect, timeout, TLS).
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Broker returned a 5xx or 408.
    #[error("Broker unavailable ({status}): {message}")]
    Unavailable {
        /// HTTP status.
        status: u16,
        /// Error details.
        message: String,
    },

    /// Order rejected by broker.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order or position not found.
    #[error("Not found: {resource}")]
    NotFound {
        /// The missing resource.
        resource: String,
    },

    /// Credentials refused.
    #[error("Broker authentication failed")]
    AuthenticationFailed,

    /// Rate limited.
    #[error("Rate limited by broker")]
    RateLimited,

    /// Response body could not be decoded.
    #[error("Malformed broker response: {message}")]
    MalformedResponse {
        /// Error details.
        message: String,
    },

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// True for failures worth retrying: transport errors, 5xx, and
    /// rate limiting. Rejections and auth failures are final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError { .. } | Self::Unavailable { .. } | Self::RateLimited
        )
    }
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit an order.
    async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck, BrokerError>;

    /// Look up one order; `None` if the broker does not know the id.
    async fn get_order(&self, id: &BrokerOrderId) -> Result<Option<OrderReport>, BrokerError>;

    /// List orders for a symbol, newest first.
    async fn list_orders(
        &self,
        symbol: &Symbol,
        status: OrderQueryStatus,
    ) -> Result<Vec<OrderReport>, BrokerError>;

    /// Cancel one order.
    async fn cancel_order(&self, id: &BrokerOrderId) -> Result<(), BrokerError>;

    /// Cancel every working order on the account.
    async fn cancel_all_orders(&self) -> Result<(), BrokerError>;

    /// All positions held on the account.
    async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// Latest quote for a symbol.
    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reference_price_prefers_mid() {
        let quote = Quote::new(Symbol::new("AAPL"), dec!(99), dec!(101));
        assert_eq!(quote.reference_price(), Some(dec!(100)));
    }

    #[test]
    fn reference_price_falls_back_to_one_side() {
        let quote = Quote::new(Symbol::new("AAPL"), dec!(0), dec!(101));
        assert_eq!(quote.reference_price(), Some(dec!(101)));
        let quote = Quote::new(Symbol::new("AAPL"), dec!(0), dec!(0));
        assert_eq!(quote.reference_price(), None);
    }

    #[test]
    fn retryable_classification() {
        assert!(BrokerError::RateLimited.is_retryable());
        assert!(
            BrokerError::Unavailable {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !BrokerError::OrderRejected {
                reason: "insufficient qty".to_string()
            }
            .is_retryable()
        );
        assert!(!BrokerError::AuthenticationFailed.is_retryable());
    }

    #[test]
    fn asset_class_parsing() {
        assert_eq!(AssetClass::from_broker("us_option"), AssetClass::UsOption);
        assert_eq!(
            AssetClass::from_broker("fx"),
            AssetClass::Other("fx".to_string())
        );
    }
}
