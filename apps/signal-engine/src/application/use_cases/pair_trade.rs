//! Pair Trade Use Case
//!
//! Opens and closes two-leg option pairs on the options account.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::context::EngineContext;
use crate::application::dto::{Outcome, PairedSignal, SignalOutcome};
use crate::application::ports::{BrokerPort, SettingsPort};
use crate::application::services::{LegFailure, PairCoordinator, PairOpenRequest, PairOutcome};
use crate::domain::position::{PairedPosition, PairedPositionRepository, PositionRepository};
use crate::domain::shared::{PositionId, ProductLine, Symbol};

/// Which pair a close targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairTarget {
    /// The strategy's open pair.
    Strategy(String),
    /// A pair by id.
    Id(PositionId),
}

/// Use case for paired positions.
pub struct PairTradeUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    context: Arc<EngineContext<B, R, P, S>>,
}

impl<B, R, P, S> PairTradeUseCase<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Create a new PairTradeUseCase.
    pub const fn new(context: Arc<EngineContext<B, R, P, S>>) -> Self {
        Self { context }
    }

    fn coordinator(&self) -> PairCoordinator<B, P> {
        PairCoordinator::new(
            self.context.reconciler(ProductLine::Options),
            Arc::clone(&self.context.pairs),
        )
    }

    /// Open a pair of `quantity` contracts per leg.
    pub async fn open(&self, signal: &PairedSignal, quantity: Decimal) -> SignalOutcome {
        let legs = [signal.sell_symbol.clone(), signal.buy_symbol.clone()];
        let Some(_guard) = self.context.sessions.try_begin(&legs) else {
            return SignalOutcome::conflict(format!(
                "a leg of strategy {} is in flight",
                signal.strategy
            ));
        };

        let request = PairOpenRequest {
            strategy: signal.strategy.clone(),
            reason: signal.reason.clone(),
            sell_symbol: signal.sell_symbol.clone(),
            buy_symbol: signal.buy_symbol.clone(),
            quantity,
        };
        match self.coordinator().open(&request).await {
            Ok(outcome) => describe(outcome),
            Err(e) => SignalOutcome::failed(e.to_string()),
        }
    }

    /// Close a pair.
    ///
    /// Closed or unknown pairs make no broker call.
    pub async fn close(&self, target: &PairTarget) -> SignalOutcome {
        let found = match target {
            PairTarget::Strategy(strategy) => {
                self.context.pairs.find_open_by_strategy(strategy).await
            }
            PairTarget::Id(id) => self.context.pairs.find_by_id(id).await,
        };
        let pair = match found {
            Ok(Some(pair)) => pair,
            Ok(None) => return SignalOutcome::not_found(format!("no open pair for {target:?}")),
            Err(e) => return SignalOutcome::failed(e.to_string()),
        };
        if !pair.is_open() {
            return SignalOutcome::conflict(format!("pair {} is already closed", pair.id));
        }

        let Some(_guard) = self.context.sessions.try_begin(&leg_symbols(&pair)) else {
            return SignalOutcome::conflict(format!("a leg of pair {} is in flight", pair.id));
        };

        match self.coordinator().close_by_id(&pair.id).await {
            Ok(outcome) => describe(outcome),
            Err(e) => SignalOutcome::failed(e.to_string()),
        }
    }
}

fn leg_symbols(pair: &PairedPosition) -> [Symbol; 2] {
    [pair.sell_leg.symbol.clone(), pair.buy_leg.symbol.clone()]
}

fn describe(outcome: PairOutcome) -> SignalOutcome {
    match outcome {
        PairOutcome::Opened(pair) => SignalOutcome::executed(format!(
            "opened pair {} for strategy {}",
            pair.id, pair.strategy
        )),
        PairOutcome::Closed(pair) => SignalOutcome::executed(format!(
            "closed pair {} for strategy {}",
            pair.id, pair.strategy
        )),
        PairOutcome::PartialFailure { filled, failures } => {
            let filled: Vec<String> = filled.iter().map(|f| f.symbol.to_string()).collect();
            SignalOutcome::new(
                Outcome::PartialFailure,
                format!(
                    "filled [{}]; failed {}",
                    filled.join(", "),
                    describe_failures(&failures)
                ),
            )
        }
        PairOutcome::Failed { failures } => {
            SignalOutcome::failed(format!("failed {}", describe_failures(&failures)))
        }
        PairOutcome::Conflict { message } => SignalOutcome::conflict(message),
        PairOutcome::NotFound { message } => SignalOutcome::not_found(message),
    }
}

fn describe_failures(failures: &[LegFailure]) -> String {
    let parts: Vec<String> = failures
        .iter()
        .map(|f| format!("{} {}: {}", f.side, f.symbol, f.reason))
        .collect();
    format!("[{}]", parts.join("; "))
}
