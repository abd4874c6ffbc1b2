//! In-memory stores for positions, pairs, settings, and signal history.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{
    HistoryError, SettingsError, SettingsPort, SignalHistoryPort, SignalRecord, StartStopSettings,
    TradingSettings,
};
use crate::domain::position::{
    CloseOutcome, NewPosition, PairExit, PairedPosition, PairedPositionRepository, Position,
    PositionError, PositionExit, PositionRepository, TradingMode,
};
use crate::domain::shared::{PositionId, ProductLine, Symbol};

// ============================================================================
// Single-leg positions
// ============================================================================

/// In-memory implementation of `PositionRepository`.
///
/// Closed records are kept; only their status changes.
#[derive(Debug, Default)]
pub struct InMemoryPositionRepository {
    positions: RwLock<Vec<Position>>,
}

impl InMemoryPositionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, open or closed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }

    /// Every record, open or closed.
    #[must_use]
    pub fn all(&self) -> Vec<Position> {
        self.positions.read().clone()
    }
}

fn position_key(symbol: &Symbol, mode: TradingMode) -> String {
    format!("{symbol}/{mode}")
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn open_position(&self, entry: NewPosition) -> Result<PositionId, PositionError> {
        let mut positions = self.positions.write();
        if positions
            .iter()
            .any(|p| p.is_open() && p.symbol == entry.symbol && p.mode == entry.mode)
        {
            return Err(PositionError::Conflict {
                key: position_key(&entry.symbol, entry.mode),
            });
        }
        let position = Position::open(entry);
        let id = position.id.clone();
        positions.push(position);
        Ok(id)
    }

    async fn close_position(
        &self,
        symbol: &Symbol,
        mode: TradingMode,
        exit: PositionExit,
    ) -> Result<CloseOutcome, PositionError> {
        let mut positions = self.positions.write();
        let Some(position) = positions
            .iter_mut()
            .find(|p| p.is_open() && &p.symbol == symbol && p.mode == mode)
        else {
            return Ok(CloseOutcome::NotFound);
        };
        position.close(exit)?;
        Ok(CloseOutcome::Closed(position.clone()))
    }

    async fn find_open(
        &self,
        symbol: &Symbol,
        mode: TradingMode,
    ) -> Result<Option<Position>, PositionError> {
        Ok(self
            .positions
            .read()
            .iter()
            .find(|p| p.is_open() && &p.symbol == symbol && p.mode == mode)
            .cloned())
    }

    async fn list_open(&self, mode: Option<TradingMode>) -> Result<Vec<Position>, PositionError> {
        Ok(self
            .positions
            .read()
            .iter()
            .filter(|p| p.is_open() && mode.is_none_or(|m| p.mode == m))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Paired positions
// ============================================================================

/// In-memory implementation of `PairedPositionRepository`.
#[derive(Debug, Default)]
pub struct InMemoryPairedPositionRepository {
    pairs: RwLock<Vec<PairedPosition>>,
}

impl InMemoryPairedPositionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pair, open or closed.
    #[must_use]
    pub fn all(&self) -> Vec<PairedPosition> {
        self.pairs.read().clone()
    }

    fn update<F>(&self, id: &PositionId, apply: F) -> Result<PairedPosition, PositionError>
    where
        F: FnOnce(&mut PairedPosition) -> Result<(), PositionError>,
    {
        let mut pairs = self.pairs.write();
        let pair = pairs
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| PositionError::NotFound {
                key: id.to_string(),
            })?;
        apply(pair)?;
        Ok(pair.clone())
    }
}

#[async_trait]
impl PairedPositionRepository for InMemoryPairedPositionRepository {
    async fn insert_open(&self, pair: PairedPosition) -> Result<PositionId, PositionError> {
        let mut pairs = self.pairs.write();
        if pairs
            .iter()
            .any(|p| p.is_open() && p.strategy == pair.strategy)
        {
            return Err(PositionError::Conflict {
                key: pair.strategy.clone(),
            });
        }
        let id = pair.id.clone();
        pairs.push(pair);
        Ok(id)
    }

    async fn find_by_id(&self, id: &PositionId) -> Result<Option<PairedPosition>, PositionError> {
        Ok(self.pairs.read().iter().find(|p| &p.id == id).cloned())
    }

    async fn find_open_by_strategy(
        &self,
        strategy: &str,
    ) -> Result<Option<PairedPosition>, PositionError> {
        Ok(self
            .pairs
            .read()
            .iter()
            .find(|p| p.is_open() && p.strategy == strategy)
            .cloned())
    }

    async fn find_open_by_leg(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<PairedPosition>, PositionError> {
        Ok(self
            .pairs
            .read()
            .iter()
            .find(|p| p.is_open() && p.has_leg(symbol))
            .cloned())
    }

    async fn record_partial_exit(
        &self,
        id: &PositionId,
        exit: PairExit,
    ) -> Result<PairedPosition, PositionError> {
        self.update(id, |pair| pair.record_leg_exits(exit).map_err(PositionError::from))
    }

    async fn close_pair(
        &self,
        id: &PositionId,
        exit: PairExit,
    ) -> Result<PairedPosition, PositionError> {
        self.update(id, |pair| pair.close(exit).map_err(PositionError::from))
    }
}

// ============================================================================
// Settings
// ============================================================================

/// In-memory settings and kill switches.
#[derive(Debug)]
pub struct InMemorySettingsRepository {
    trading: RwLock<TradingSettings>,
    switches: RwLock<StartStopSettings>,
}

impl InMemorySettingsRepository {
    /// Seed the store.
    #[must_use]
    pub fn new(trading: TradingSettings, switches: StartStopSettings) -> Self {
        Self {
            trading: RwLock::new(trading),
            switches: RwLock::new(switches),
        }
    }

    /// Replace sizing and thresholds.
    pub fn set_trading(&self, trading: TradingSettings) {
        *self.trading.write() = trading;
    }

    /// Change the equity order size.
    pub fn set_stock_amount(&self, amount: Decimal) {
        self.trading.write().stock_amount = amount;
    }
}

impl Default for InMemorySettingsRepository {
    /// One share or contract per order, 2% take-profit, 0.3% stop, every
    /// product started.
    fn default() -> Self {
        Self::new(
            TradingSettings {
                stock_amount: dec!(1),
                options_amount: dec!(1),
                profit_percent: dec!(2),
                loss_percent: dec!(0.3),
            },
            StartStopSettings {
                stock_start: true,
                options_start: true,
                short_stock_start: true,
            },
        )
    }
}

#[async_trait]
impl SettingsPort for InMemorySettingsRepository {
    async fn trading_settings(&self) -> Result<TradingSettings, SettingsError> {
        Ok(self.trading.read().clone())
    }

    async fn start_stop(&self) -> Result<StartStopSettings, SettingsError> {
        Ok(*self.switches.read())
    }

    async fn set_started(&self, product: ProductLine, started: bool) -> Result<(), SettingsError> {
        self.switches.write().set(product, started);
        Ok(())
    }
}

// ============================================================================
// Signal history
// ============================================================================

/// Records kept when no capacity is given.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// In-memory signal history; the oldest record is dropped once full.
#[derive(Debug)]
pub struct InMemorySignalHistory {
    records: RwLock<VecDeque<SignalRecord>>,
    capacity: usize,
}

impl InMemorySignalHistory {
    /// Create with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create holding at most `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Every record, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<SignalRecord> {
        self.records.read().iter().cloned().collect()
    }
}

impl Default for InMemorySignalHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalHistoryPort for InMemorySignalHistory {
    async fn record(&self, record: SignalRecord) -> Result<(), HistoryError> {
        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SignalRecord>, HistoryError> {
        Ok(self.records.read().iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{LegExit, PairLeg};
    use crate::application::dto::Outcome;
    use crate::domain::order_execution::OrderSide;
    use crate::domain::shared::BrokerOrderId;
    use chrono::Utc;
    use std::sync::Arc;

    fn entry(symbol: &str, mode: TradingMode) -> NewPosition {
        NewPosition {
            symbol: Symbol::new(symbol),
            quantity: dec!(10),
            entry_price: dec!(100),
            mode,
            broker_order_id: BrokerOrderId::new("o-1"),
            entry_at: Utc::now(),
        }
    }

    fn exit(price: Decimal) -> PositionExit {
        PositionExit {
            exit_price: price,
            exit_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_open_for_same_key_conflicts() {
        let repo = InMemoryPositionRepository::new();
        repo.open_position(entry("AAPL", TradingMode::Auto))
            .await
            .unwrap();

        let err = repo
            .open_position(entry("AAPL", TradingMode::Auto))
            .await
            .unwrap_err();
        assert!(matches!(err, PositionError::Conflict { .. }));

        // Different mode is a different key.
        repo.open_position(entry("AAPL", TradingMode::Manual))
            .await
            .unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_opens_leave_one_record() {
        let repo = Arc::new(InMemoryPositionRepository::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(
                    async move { repo.open_position(entry("MSFT", TradingMode::Auto)).await },
                )
            })
            .collect();

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                opened += 1;
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(repo.list_open(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn close_missing_is_not_found() {
        let repo = InMemoryPositionRepository::new();
        let outcome = repo
            .close_position(&Symbol::new("AAPL"), TradingMode::Auto, exit(dec!(1)))
            .await
            .unwrap();
        assert_eq!(outcome, CloseOutcome::NotFound);
    }

    #[tokio::test]
    async fn close_keeps_record_and_allows_reopen() {
        let repo = InMemoryPositionRepository::new();
        repo.open_position(entry("AAPL", TradingMode::Auto))
            .await
            .unwrap();

        let outcome = repo
            .close_position(&Symbol::new("AAPL"), TradingMode::Auto, exit(dec!(105)))
            .await
            .unwrap();
        let CloseOutcome::Closed(closed) = outcome else {
            panic!("expected Closed");
        };
        assert_eq!(closed.exit_price, Some(dec!(105)));
        assert!(
            repo.find_open(&Symbol::new("AAPL"), TradingMode::Auto)
                .await
                .unwrap()
                .is_none()
        );

        repo.open_position(entry("AAPL", TradingMode::Auto))
            .await
            .unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(
            repo.list_open(Some(TradingMode::Manual))
                .await
                .unwrap()
                .len(),
            0
        );
    }

    fn pair(strategy: &str) -> PairedPosition {
        let leg = |symbol: &str, id: &str| PairLeg {
            symbol: Symbol::new(symbol),
            order_id: Some(BrokerOrderId::new(id)),
            quantity: dec!(1),
            entry_price: Some(dec!(2)),
            exit_order_id: None,
            exit_price: None,
            exit_quantity: None,
        };
        PairedPosition::open(
            strategy,
            "test",
            leg("SPY240621C00450000", "s-1"),
            leg("SPY240621C00455000", "b-1"),
            Utc::now(),
        )
    }

    fn leg_exit(id: &str) -> LegExit {
        LegExit {
            order_id: BrokerOrderId::new(id),
            price: dec!(1),
            quantity: dec!(1),
        }
    }

    #[tokio::test]
    async fn one_open_pair_per_strategy() {
        let repo = InMemoryPairedPositionRepository::new();
        repo.insert_open(pair("spread")).await.unwrap();
        let err = repo.insert_open(pair("spread")).await.unwrap_err();
        assert!(matches!(err, PositionError::Conflict { .. }));
        repo.insert_open(pair("other")).await.unwrap();
    }

    #[tokio::test]
    async fn partial_exit_then_close() {
        let repo = InMemoryPairedPositionRepository::new();
        let id = repo.insert_open(pair("spread")).await.unwrap();
        let leg = Symbol::new("SPY240621C00455000");
        assert!(repo.find_open_by_leg(&leg).await.unwrap().is_some());

        let updated = repo
            .record_partial_exit(
                &id,
                PairExit {
                    sell_leg: Some(leg_exit("x-1")),
                    buy_leg: None,
                    exit_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(updated.is_open());
        assert!(updated.sell_leg.exit_order_id.is_some());

        let closed = repo
            .close_pair(
                &id,
                PairExit {
                    sell_leg: None,
                    buy_leg: Some(leg_exit("x-2")),
                    exit_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(!closed.is_open());
        assert!(repo.find_open_by_strategy("spread").await.unwrap().is_none());

        let err = repo
            .close_pair(
                &id,
                PairExit {
                    sell_leg: None,
                    buy_leg: None,
                    exit_at: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PositionError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn unknown_pair_is_not_found() {
        let repo = InMemoryPairedPositionRepository::new();
        let err = repo
            .close_pair(
                &PositionId::new("missing"),
                PairExit {
                    sell_leg: None,
                    buy_leg: None,
                    exit_at: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PositionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn kill_switches_are_per_product() {
        let settings = InMemorySettingsRepository::default();
        settings
            .set_started(ProductLine::Options, false)
            .await
            .unwrap();
        let switches = settings.start_stop().await.unwrap();
        assert!(!switches.is_started(ProductLine::Options));
        assert!(switches.is_started(ProductLine::Equities));

        settings.set_stock_amount(dec!(25));
        assert_eq!(
            settings.trading_settings().await.unwrap().stock_amount,
            dec!(25)
        );
    }

    fn signal(symbol: &str, side: OrderSide) -> SignalRecord {
        SignalRecord {
            product: ProductLine::Equities,
            mode: Some(TradingMode::Auto),
            side,
            symbol: Symbol::new(symbol),
            quantity: None,
            price: Some(dec!(100)),
            outcome: Outcome::Executed,
            message: String::new(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let history = InMemorySignalHistory::with_capacity(2);
        history.record(signal("AAPL", OrderSide::Buy)).await.unwrap();
        history.record(signal("MSFT", OrderSide::Buy)).await.unwrap();
        history.record(signal("AAPL", OrderSide::Sell)).await.unwrap();

        let recent = history.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].symbol.as_str(), "AAPL");
        assert_eq!(recent[0].side, OrderSide::Sell);
        assert_eq!(recent[1].symbol.as_str(), "MSFT");

        assert_eq!(history.recent(1).await.unwrap().len(), 1);
        assert_eq!(history.all()[0].symbol.as_str(), "MSFT");
    }
}
