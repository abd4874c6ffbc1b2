//! Short Equity Use Case
//!
//! Orders on the short-equities account. Nothing is recorded in the
//! position store; the broker's positions are the source of truth, and
//! both sides use good-till-canceled market orders.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::reconcile_failure;
use crate::application::context::EngineContext;
use crate::application::dto::SignalOutcome;
use crate::application::ports::{BrokerPort, SettingsPort};
use crate::application::services::FillLookup;
use crate::domain::order_execution::{OrderIntent, OrderSide, TimeInForce};
use crate::domain::position::{PairedPositionRepository, PositionRepository};
use crate::domain::shared::{ProductLine, Symbol};

/// Use case for the short-equities account.
pub struct ShortEquityUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    context: Arc<EngineContext<B, R, P, S>>,
}

impl<B, R, P, S> ShortEquityUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Create a new ShortEquityUseCase.
    pub const fn new(context: Arc<EngineContext<B, R, P, S>>) -> Self {
        Self { context }
    }

    /// Market buy of `quantity` shares.
    pub async fn buy(&self, symbol: &Symbol, quantity: Decimal) -> SignalOutcome {
        let Some(_guard) = self
            .context
            .sessions
            .try_begin(std::slice::from_ref(symbol))
        else {
            return SignalOutcome::conflict(format!("{symbol} has an order in flight"));
        };

        self.execute(symbol, OrderSide::Buy, quantity).await
    }

    /// Flatten whatever the account holds in `symbol`.
    ///
    /// Returns `not_found` without trading when nothing is held.
    pub async fn sell(&self, symbol: &Symbol) -> SignalOutcome {
        let ctx = &self.context;
        let Some(_guard) = ctx.sessions.try_begin(std::slice::from_ref(symbol)) else {
            return SignalOutcome::conflict(format!("{symbol} has an order in flight"));
        };

        let positions = match ctx
            .brokers
            .for_product(ProductLine::ShortEquities)
            .list_positions()
            .await
        {
            Ok(positions) => positions,
            Err(e) => return SignalOutcome::failed(format!("failed to list positions: {e}")),
        };

        let held = positions
            .iter()
            .find(|p| &p.symbol == symbol)
            .map(|p| p.quantity)
            .filter(|q| !q.is_zero());
        let Some(held) = held else {
            return SignalOutcome::not_found(format!("no {symbol} held on the short account"));
        };

        self.execute(symbol, OrderSide::flattening(held), held.abs())
            .await
    }

    async fn execute(&self, symbol: &Symbol, side: OrderSide, quantity: Decimal) -> SignalOutcome {
        let intent = OrderIntent::market(symbol.clone(), side, quantity)
            .with_time_in_force(TimeInForce::Gtc)
            .with_tag("short");

        match self
            .context
            .reconciler(ProductLine::ShortEquities)
            .resolve_fill(&intent, FillLookup::ById)
            .await
        {
            Ok(fill) => {
                let price = fill.price().unwrap_or_default();
                tracing::info!(
                    symbol = %symbol,
                    side = %side,
                    quantity = %fill.filled_quantity,
                    price = %price,
                    "Short account order filled"
                );
                SignalOutcome::executed(format!(
                    "{side} {} {symbol} at {price}",
                    fill.filled_quantity
                ))
            }
            Err(e) => reconcile_failure(symbol, &e),
        }
    }
}
