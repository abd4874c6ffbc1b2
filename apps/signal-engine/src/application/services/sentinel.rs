//! Scheduled Sentinel
//!
//! Periodic task that runs alongside the signal handlers. While the regular
//! session is open, each tick:
//!
//! 1. Force-liquidates option positions expiring today inside the pre-close
//!    window, and records the exit on any open pair holding the leg.
//! 2. Closes auto-managed equity positions whose protective stop filled at
//!    the broker.
//! 3. Ratchets the trailing floor of every other auto-managed equity
//!    position and re-arms its stop when the level moved.
//!
//! Symbols with an entry or exit in flight are skipped. A failure on one
//! position is logged and collected; it never aborts the rest of the tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::fill_reconciler::{FillLookup, ReconcileError};
use super::pair_coordinator::PairCoordinator;
use super::protective_orders::{ArmRequest, ProtectiveOrderError, StopStatus};
use crate::application::context::EngineContext;
use crate::application::ports::{BrokerError, BrokerPort, SettingsPort, TimeSourcePort};
use crate::domain::market_session::{ExpiryRule, MarketSession};
use crate::domain::order_execution::{OrderIntent, OrderSide};
use crate::domain::position::{
    PairedPositionRepository, Position, PositionError, PositionExit, PositionRepository,
    TradingMode,
};
use crate::domain::shared::{ProductLine, Symbol};
use crate::domain::stop_enforcement::{
    ProtectiveLevels, ProtectiveThresholds, StopEnforcementError, TrailingState,
};
use crate::observability::{
    record_forced_liquidation, record_protective_rearm, record_sentinel_tick,
    update_open_positions,
};

/// Sentinel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelConfig {
    /// Whether the sentinel runs at all.
    pub enabled: bool,
    /// Time between ticks (default: 30s).
    pub interval: Duration,
    /// Option expiry liquidation window.
    pub expiry_rule: ExpiryRule,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            expiry_rule: ExpiryRule::default(),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Whether the regular session was open.
    pub market_open: bool,
    /// Exchange-local time of the tick.
    pub local_time: DateTime<Tz>,
    /// Option positions force-liquidated.
    pub liquidated: Vec<Symbol>,
    /// Equity positions whose stop was re-armed.
    pub rearmed: Vec<Symbol>,
    /// Equity positions closed because their stop filled.
    pub closed_by_stop: Vec<Symbol>,
    /// Symbols skipped because an entry or exit was in flight.
    pub skipped_in_flight: Vec<Symbol>,
    /// Per-position failures.
    pub errors: Vec<String>,
}

impl TickReport {
    fn new(session: &MarketSession) -> Self {
        Self {
            market_open: session.is_open,
            local_time: session.local_time,
            liquidated: Vec::new(),
            rearmed: Vec::new(),
            closed_by_stop: Vec::new(),
            skipped_in_flight: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Per-position evaluation failures.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Broker call failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Position store failed.
    #[error(transparent)]
    Store(#[from] PositionError),

    /// Levels could not be computed.
    #[error(transparent)]
    Levels(#[from] StopEnforcementError),

    /// Re-arm failed.
    #[error(transparent)]
    Protective(#[from] ProtectiveOrderError),

    /// Liquidation order failed.
    #[error(transparent)]
    Liquidation(#[from] ReconcileError),

    /// Quote had neither bid nor ask.
    #[error("no usable price for {symbol}")]
    NoPrice {
        /// Symbol.
        symbol: Symbol,
    },
}

enum Evaluation {
    Rearmed,
    Unchanged,
    ClosedByStop,
}

/// The scheduled sentinel.
pub struct Sentinel<B, R, P, S, C>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
    C: TimeSourcePort,
{
    context: Arc<EngineContext<B, R, P, S>>,
    clock: Arc<C>,
    config: SentinelConfig,
}

impl<B, R, P, S, C> Sentinel<B, R, P, S, C>
where
    B: BrokerPort + 'static,
    R: PositionRepository + 'static,
    P: PairedPositionRepository + 'static,
    S: SettingsPort + 'static,
    C: TimeSourcePort + 'static,
{
    /// Create a sentinel.
    pub const fn new(
        context: Arc<EngineContext<B, R, P, S>>,
        clock: Arc<C>,
        config: SentinelConfig,
    ) -> Self {
        Self {
            context,
            clock,
            config,
        }
    }

    /// Run ticks on the configured interval until `shutdown` is cancelled.
    ///
    /// A tick in progress finishes before the task exits.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                interval_secs = self.config.interval.as_secs(),
                cutoff_minutes = self.config.expiry_rule.cutoff_minute(),
                "Sentinel started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = self.tick().await;
                        if let Some(first) = report.errors.first() {
                            tracing::error!(
                                errors = report.errors.len(),
                                first = %first,
                                "Sentinel tick finished with errors"
                            );
                        }
                    }
                    () = shutdown.cancelled() => {
                        tracing::info!("Sentinel shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Run one tick.
    pub async fn tick(&self) -> TickReport {
        let started = Instant::now();
        let now = self.clock.now().await;
        let session = MarketSession::at(now);
        let mut report = TickReport::new(&session);

        if session.is_open {
            self.sweep_expiring_options(&session, &mut report).await;
            self.evaluate_equities(now, &mut report).await;
        } else {
            tracing::debug!(local_time = %session.local_time, "Market closed, tick skipped");
        }

        record_sentinel_tick(
            report.market_open,
            report.errors.len(),
            started.elapsed().as_secs_f64(),
        );
        tracing::debug!(
            market_open = report.market_open,
            liquidated = report.liquidated.len(),
            rearmed = report.rearmed.len(),
            closed_by_stop = report.closed_by_stop.len(),
            skipped = report.skipped_in_flight.len(),
            "Sentinel tick complete"
        );
        report
    }

    // ------------------------------------------------------------------
    // Option expiry
    // ------------------------------------------------------------------

    async fn sweep_expiring_options(&self, session: &MarketSession, report: &mut TickReport) {
        let ctx = &self.context;
        let positions = match ctx.brokers.options.list_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list option positions");
                report.errors.push(format!("option positions: {e}"));
                return;
            }
        };

        for position in positions {
            let symbol = position.symbol.clone();
            if position.quantity.is_zero()
                || !self
                    .config
                    .expiry_rule
                    .should_liquidate(&symbol, &session.local_time)
            {
                continue;
            }

            let Some(_guard) = ctx.sessions.try_begin(std::slice::from_ref(&symbol)) else {
                report.skipped_in_flight.push(symbol);
                continue;
            };

            match self.liquidate(&symbol, position.quantity).await {
                Ok(()) => report.liquidated.push(symbol),
                Err(e) => {
                    tracing::error!(symbol = %symbol, error = %e, "Expiry liquidation failed");
                    report.errors.push(format!("{symbol}: {e}"));
                }
            }
        }
    }

    async fn liquidate(
        &self,
        symbol: &Symbol,
        signed_quantity: rust_decimal::Decimal,
    ) -> Result<(), SentinelError> {
        let ctx = &self.context;
        let side = OrderSide::flattening(signed_quantity);
        let intent =
            OrderIntent::market(symbol.clone(), side, signed_quantity.abs()).with_tag("expiry");

        tracing::info!(
            symbol = %symbol,
            side = %side,
            quantity = %signed_quantity.abs(),
            "Liquidating expiring option"
        );
        let fill = ctx
            .reconciler(ProductLine::Options)
            .resolve_fill(&intent, FillLookup::ById)
            .await?;
        record_forced_liquidation(ProductLine::Options.as_str());

        let coordinator =
            PairCoordinator::new(ctx.reconciler(ProductLine::Options), Arc::clone(&ctx.pairs));
        coordinator.apply_liquidation(&fill).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Equity protection
    // ------------------------------------------------------------------

    async fn evaluate_equities(&self, now: DateTime<Utc>, report: &mut TickReport) {
        let ctx = &self.context;
        let positions = match ctx.positions.list_open(Some(TradingMode::Auto)).await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list open positions");
                report.errors.push(format!("open positions: {e}"));
                return;
            }
        };
        update_open_positions("auto", positions.len());
        if positions.is_empty() {
            return;
        }

        let thresholds = match ctx.settings.trading_settings().await {
            Ok(settings) => settings.thresholds(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load trading settings");
                report.errors.push(format!("settings: {e}"));
                return;
            }
        };

        for position in positions {
            let symbol = position.symbol.clone();
            let Some(_guard) = ctx.sessions.try_begin(std::slice::from_ref(&symbol)) else {
                tracing::debug!(symbol = %symbol, "Entry or exit in flight, skipping");
                report.skipped_in_flight.push(symbol);
                continue;
            };

            match self.evaluate_position(&position, &thresholds, now).await {
                Ok(Evaluation::Rearmed) => report.rearmed.push(symbol),
                Ok(Evaluation::ClosedByStop) => report.closed_by_stop.push(symbol),
                Ok(Evaluation::Unchanged) => {}
                Err(e) => {
                    record_protective_rearm("failed");
                    tracing::error!(symbol = %symbol, error = %e, "Position evaluation failed");
                    report.errors.push(format!("{symbol}: {e}"));
                }
            }
        }
    }

    async fn evaluate_position(
        &self,
        position: &Position,
        thresholds: &ProtectiveThresholds,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, SentinelError> {
        let ctx = &self.context;
        let symbol = &position.symbol;
        let broker = &ctx.brokers.equities;
        let mut session = ctx.sessions.snapshot(symbol);
        let mut active_order_id = session
            .protective
            .as_ref()
            .and_then(|p| p.active_order_id.clone());

        if let Some(order_id) = active_order_id.clone() {
            match ctx.protective().status(&order_id, position.quantity).await? {
                StopStatus::Working => {}
                StopStatus::Filled { price, filled_at } => {
                    let exit = PositionExit {
                        exit_price: price,
                        exit_at: filled_at.unwrap_or(now),
                    };
                    ctx.positions
                        .close_position(symbol, TradingMode::Auto, exit)
                        .await?;
                    ctx.sessions.reset(symbol);
                    tracing::info!(
                        symbol = %symbol,
                        broker_order_id = %order_id,
                        exit_price = %price,
                        "Protective stop filled, position closed"
                    );
                    return Ok(Evaluation::ClosedByStop);
                }
                StopStatus::Gone => {
                    tracing::warn!(
                        symbol = %symbol,
                        broker_order_id = %order_id,
                        "Protective stop no longer working, re-arming"
                    );
                    session.protective = None;
                    active_order_id = None;
                    ctx.sessions.update(symbol, |s| s.protective = None);
                }
            }
        }

        let quote = broker.get_quote(symbol).await?;
        let price = quote
            .reference_price()
            .ok_or_else(|| SentinelError::NoPrice {
                symbol: symbol.clone(),
            })?;

        let (entry_floor, highest_price) = ctx.sessions.update(symbol, |s| {
            let trailing = s
                .trailing
                .get_or_insert_with(|| TrailingState::new(position.entry_price));
            let floor = trailing.observe(price);
            (floor, trailing.highest_price())
        });

        let levels =
            ProtectiveLevels::compute(symbol.as_str(), entry_floor, highest_price, thresholds)?;
        let unchanged = session
            .protective
            .as_ref()
            .is_some_and(|p| p.active_order_id.is_some() && p.stop_price == levels.stop_loss);
        if unchanged {
            record_protective_rearm("unchanged");
            return Ok(Evaluation::Unchanged);
        }

        let state = ctx
            .protective()
            .arm(ArmRequest {
                symbol: symbol.clone(),
                quantity: position.quantity,
                entry_floor,
                highest_price,
                thresholds: *thresholds,
                previous_order_id: active_order_id,
            })
            .await?;
        tracing::info!(
            symbol = %symbol,
            price = %price,
            entry_floor = %entry_floor,
            stop_loss = %state.stop_price,
            "Trailing stop re-armed"
        );
        ctx.sessions.update(symbol, |s| s.protective = Some(state));
        record_protective_rearm("armed");
        Ok(Evaluation::Rearmed)
    }
}
