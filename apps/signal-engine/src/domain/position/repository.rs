//! Position Repository Traits
//!
//! Persistence abstraction for positions. Implemented by adapters in the
//! infrastructure layer. Implementations own the uniqueness invariants and
//! must apply them as conditional writes, not query-then-write.

use async_trait::async_trait;

use super::entity::{NewPosition, Position, PositionExit};
use super::errors::PositionError;
use super::paired::{PairExit, PairedPosition};
use super::value_objects::TradingMode;
use crate::domain::shared::{PositionId, Symbol};

/// Result of a close attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The open record was closed.
    Closed(Position),
    /// No open record for the key; nothing changed.
    NotFound,
}

/// Repository for single-leg positions.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Insert an open position.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if an open position already exists for
    /// `(symbol, mode)`.
    async fn open_position(&self, entry: NewPosition) -> Result<PositionId, PositionError>;

    /// Close the open position for `(symbol, mode)`.
    ///
    /// Missing records yield `CloseOutcome::NotFound`, not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn close_position(
        &self,
        symbol: &Symbol,
        mode: TradingMode,
        exit: PositionExit,
    ) -> Result<CloseOutcome, PositionError>;

    /// Find the open position for `(symbol, mode)`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn find_open(
        &self,
        symbol: &Symbol,
        mode: TradingMode,
    ) -> Result<Option<Position>, PositionError>;

    /// List open positions, optionally restricted to one mode.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn list_open(&self, mode: Option<TradingMode>) -> Result<Vec<Position>, PositionError>;
}

/// Repository for paired positions.
#[async_trait]
pub trait PairedPositionRepository: Send + Sync {
    /// Insert an open pair.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if an open pair already exists for the strategy.
    async fn insert_open(&self, pair: PairedPosition) -> Result<PositionId, PositionError>;

    /// Find a pair by id, open or closed.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn find_by_id(&self, id: &PositionId) -> Result<Option<PairedPosition>, PositionError>;

    /// Find the open pair for a strategy.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn find_open_by_strategy(
        &self,
        strategy: &str,
    ) -> Result<Option<PairedPosition>, PositionError>;

    /// Find the open pair holding a leg in `symbol`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    async fn find_open_by_leg(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<PairedPosition>, PositionError>;

    /// Record exits for some legs of an open pair without closing it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `Lifecycle` if the pair is
    /// already closed.
    async fn record_partial_exit(
        &self,
        id: &PositionId,
        exit: PairExit,
    ) -> Result<PairedPosition, PositionError>;

    /// Close an open pair.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `Lifecycle` if the pair is
    /// already closed.
    async fn close_pair(
        &self,
        id: &PositionId,
        exit: PairExit,
    ) -> Result<PairedPosition, PositionError>;
}
