//! Equity Position Use Case
//!
//! Single-leg open and close for the long equities account, in auto mode
//! (protected by a trailing stop) or manual mode (no protection).

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::reconcile_failure;
use crate::application::context::EngineContext;
use crate::application::dto::SignalOutcome;
use crate::application::ports::{BrokerPort, SettingsPort};
use crate::application::services::{ArmRequest, FillLookup, ReconcileError, StopStatus};
use crate::domain::order_execution::{OrderIntent, OrderSide};
use crate::domain::position::{
    CloseOutcome, NewPosition, PairedPositionRepository, PositionError, PositionExit,
    PositionRepository, TradingMode,
};
use crate::domain::shared::{ProductLine, Symbol};
use crate::domain::stop_enforcement::TrailingState;

/// Use case for opening and closing single-leg equity positions.
pub struct EquityPositionUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    context: Arc<EngineContext<B, R, P, S>>,
}

impl<B, R, P, S> EquityPositionUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Create a new EquityPositionUseCase.
    pub const fn new(context: Arc<EngineContext<B, R, P, S>>) -> Self {
        Self { context }
    }

    /// Buy `quantity` shares and record the position.
    ///
    /// The position is recorded only after a priced fill; auto positions are
    /// then protected by a stop at the loss threshold below the fill.
    pub async fn open(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
        mode: TradingMode,
    ) -> SignalOutcome {
        let ctx = &self.context;
        let Some(_guard) = ctx.sessions.try_begin(std::slice::from_ref(symbol)) else {
            return SignalOutcome::conflict(format!("{symbol} has an entry or exit in flight"));
        };

        match ctx.positions.find_open(symbol, mode).await {
            Ok(Some(existing)) => {
                return SignalOutcome::conflict(format!(
                    "{mode} position {} already open for {symbol}",
                    existing.id
                ));
            }
            Ok(None) => {}
            Err(e) => return SignalOutcome::failed(e.to_string()),
        }

        let intent = OrderIntent::market(symbol.clone(), OrderSide::Buy, quantity).with_tag("entry");
        let fill = match ctx
            .reconciler(ProductLine::Equities)
            .resolve_fill(&intent, FillLookup::ById)
            .await
        {
            Ok(fill) => fill,
            Err(e) => return reconcile_failure(symbol, &e),
        };
        // resolve_fill only returns priced fills
        let Some(entry_price) = fill.price() else {
            return reconcile_failure(symbol, &ReconcileError::Unresolved { fill });
        };

        let entry = NewPosition {
            symbol: symbol.clone(),
            quantity: fill.filled_quantity,
            entry_price,
            mode,
            broker_order_id: fill.broker_order_id.clone(),
            entry_at: fill.filled_at.unwrap_or_else(Utc::now),
        };
        let position_id = match ctx.positions.open_position(entry).await {
            Ok(id) => id,
            Err(PositionError::Conflict { key }) => {
                tracing::error!(symbol = %symbol, key = %key, "Filled entry lost the open race");
                return SignalOutcome::conflict(format!("position already open for {key}"));
            }
            Err(e) => return SignalOutcome::failed(e.to_string()),
        };

        tracing::info!(
            symbol = %symbol,
            mode = %mode,
            position_id = %position_id,
            entry_price = %entry_price,
            quantity = %fill.filled_quantity,
            "Position opened"
        );

        let mut message = format!(
            "bought {} {symbol} at {entry_price} ({mode})",
            fill.filled_quantity
        );
        if mode == TradingMode::Auto {
            if let Err(note) = self.protect(symbol, fill.filled_quantity, entry_price).await {
                message.push_str(&format!("; stop not armed: {note}"));
            }
        }
        SignalOutcome::executed(message)
    }

    /// Sell the open position and record the exit.
    ///
    /// Makes no broker call when nothing is open.
    pub async fn close(&self, symbol: &Symbol, mode: TradingMode) -> SignalOutcome {
        let ctx = &self.context;
        let Some(_guard) = ctx.sessions.try_begin(std::slice::from_ref(symbol)) else {
            return SignalOutcome::conflict(format!("{symbol} has an entry or exit in flight"));
        };

        let position = match ctx.positions.find_open(symbol, mode).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                return SignalOutcome::not_found(format!("no open {mode} position for {symbol}"));
            }
            Err(e) => return SignalOutcome::failed(e.to_string()),
        };

        if mode == TradingMode::Auto
            && let Some(order_id) = ctx
                .sessions
                .snapshot(symbol)
                .protective
                .and_then(|p| p.active_order_id)
        {
            let protective = ctx.protective();
            if let Err(e) = protective.disarm(&order_id).await {
                return SignalOutcome::failed(format!("{symbol}: {e}"));
            }
            // The stop may have filled before the cancel reached it.
            match protective.status(&order_id, position.quantity).await {
                Ok(StopStatus::Gone) => ctx.sessions.update(symbol, |s| s.protective = None),
                Ok(StopStatus::Filled { price, filled_at }) => {
                    tracing::info!(
                        symbol = %symbol,
                        broker_order_id = %order_id,
                        exit_price = %price,
                        "Protective stop already filled, no exit order sent"
                    );
                    let exit = PositionExit {
                        exit_price: price,
                        exit_at: filled_at.unwrap_or_else(Utc::now),
                    };
                    return self.record_exit(symbol, mode, exit, "stopped out").await;
                }
                Ok(StopStatus::Working) => {
                    return SignalOutcome::failed(format!(
                        "{symbol}: protective stop {order_id} is still working"
                    ));
                }
                Err(e) => return SignalOutcome::failed(format!("{symbol}: {e}")),
            }
        }

        let intent = OrderIntent::market(symbol.clone(), OrderSide::Sell, position.quantity)
            .with_tag("exit");
        let fill = match ctx
            .reconciler(ProductLine::Equities)
            .resolve_fill(&intent, FillLookup::ById)
            .await
        {
            Ok(fill) => fill,
            Err(e) => return reconcile_failure(symbol, &e),
        };
        let Some(exit_price) = fill.price() else {
            return reconcile_failure(symbol, &ReconcileError::Unresolved { fill });
        };

        let exit = PositionExit {
            exit_price,
            exit_at: fill.filled_at.unwrap_or_else(Utc::now),
        };
        self.record_exit(symbol, mode, exit, "sold").await
    }

    async fn record_exit(
        &self,
        symbol: &Symbol,
        mode: TradingMode,
        exit: PositionExit,
        verb: &str,
    ) -> SignalOutcome {
        let ctx = &self.context;
        let exit_price = exit.exit_price;
        let outcome = ctx.positions.close_position(symbol, mode, exit).await;
        if mode == TradingMode::Auto {
            ctx.sessions.reset(symbol);
        }

        match outcome {
            Ok(CloseOutcome::Closed(closed)) => {
                let pnl = closed.realized_pnl().unwrap_or_default();
                tracing::info!(
                    symbol = %symbol,
                    mode = %mode,
                    position_id = %closed.id,
                    exit_price = %exit_price,
                    pnl = %pnl,
                    "Position closed"
                );
                SignalOutcome::executed(format!(
                    "{verb} {} {symbol} at {exit_price}, pnl {pnl}",
                    closed.quantity
                ))
            }
            Ok(CloseOutcome::NotFound) => {
                tracing::error!(symbol = %symbol, "Position vanished while its exit was filling");
                SignalOutcome::not_found(format!("no open {mode} position for {symbol}"))
            }
            Err(e) => SignalOutcome::failed(e.to_string()),
        }
    }

    async fn protect(
        &self,
        symbol: &Symbol,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Result<(), String> {
        let ctx = &self.context;
        ctx.sessions.update(symbol, |s| {
            s.trailing = Some(TrailingState::new(entry_price));
            s.protective = None;
        });

        let thresholds = ctx
            .settings
            .trading_settings()
            .await
            .map_err(|e| e.to_string())?
            .thresholds();

        let request = ArmRequest {
            symbol: symbol.clone(),
            quantity,
            entry_floor: entry_price,
            highest_price: entry_price,
            thresholds,
            previous_order_id: None,
        };
        match ctx.protective().arm(request).await {
            Ok(state) => {
                ctx.sessions.update(symbol, |s| s.protective = Some(state));
                Ok(())
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Failed to arm protective stop");
                Err(e.to_string())
            }
        }
    }
}
