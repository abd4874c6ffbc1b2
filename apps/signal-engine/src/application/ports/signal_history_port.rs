//! Signal History Port (Driven Port)
//!
//! Audit trail of single-leg signals: what was asked for and how the engine
//! answered.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::dto::Outcome;
use crate::domain::order_execution::OrderSide;
use crate::domain::position::TradingMode;
use crate::domain::shared::{ProductLine, Symbol};

/// One handled equity or short-equity signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Account the signal targeted.
    pub product: ProductLine,
    /// Trading mode; `None` on the short-equities account.
    pub mode: Option<TradingMode>,
    /// Buy or sell.
    pub side: OrderSide,
    /// Symbol as received.
    pub symbol: Symbol,
    /// Quantity carried by the signal.
    pub quantity: Option<Decimal>,
    /// Price quoted by the signal source.
    pub price: Option<Decimal>,
    /// Engine answer.
    pub outcome: Outcome,
    /// Engine message.
    pub message: String,
    /// When the signal arrived.
    pub received_at: DateTime<Utc>,
}

/// History store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// Store unreachable or rejected the write.
    #[error("Signal history unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for the signal audit trail.
#[async_trait]
pub trait SignalHistoryPort: Debug + Send + Sync {
    /// Append a record.
    async fn record(&self, record: SignalRecord) -> Result<(), HistoryError>;

    /// Latest records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<SignalRecord>, HistoryError>;
}
