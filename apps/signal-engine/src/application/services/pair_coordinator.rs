//! Pair Trade Coordinator
//!
//! Opens and closes two-leg option spreads.
//!
//! Opening submits the buy leg first, then the sell leg, and resolves both
//! fills from the symbol's order history. A pair is stored as open only
//! when every applicable leg filled with a price. Closing inverts the sides
//! using the quantities recorded at open time; a pair is stored as closed
//! only when every entered leg has an exit fill.
//!
//! ```text
//! NONE ──▶ OPENING ──▶ OPEN ──▶ CLOSING ──▶ CLOSED
//!   ▲         │          ▲         │
//!   └─────────┘          └─────────┘
//!   (leg failed)         (leg failed)
//! ```

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::fill_reconciler::{FillLookup, FillReconciler};
use crate::application::ports::BrokerPort;
use crate::domain::order_execution::{FillStatus, OrderFill, OrderIntent, OrderSide};
use crate::domain::position::{
    LegExit, PairExit, PairLeg, PairState, PairedPosition, PairedPositionRepository,
    PositionError,
};
use crate::domain::shared::{PositionId, Symbol};

/// Request to open a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOpenRequest {
    /// Strategy name; one open pair per strategy.
    pub strategy: String,
    /// Free-form reason stored with the pair.
    pub reason: String,
    /// Leg sold to open. Empty when absent.
    pub sell_symbol: Symbol,
    /// Leg bought to open. Empty when absent.
    pub buy_symbol: Symbol,
    /// Contracts per leg.
    pub quantity: Decimal,
}

/// A leg that failed to submit or fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegFailure {
    /// Leg symbol.
    pub symbol: Symbol,
    /// Side attempted.
    pub side: OrderSide,
    /// What went wrong.
    pub reason: String,
}

/// Result of a pair operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// Every leg filled and the pair is stored open.
    Opened(PairedPosition),
    /// Every leg exited and the pair is stored closed.
    Closed(PairedPosition),
    /// Some legs traded, others failed. The pair is not in the target state.
    PartialFailure {
        /// Legs that filled.
        filled: Vec<OrderFill>,
        /// Legs that did not.
        failures: Vec<LegFailure>,
    },
    /// Nothing traded.
    Failed {
        /// Legs that failed.
        failures: Vec<LegFailure>,
    },
    /// The pair is already in the requested state.
    Conflict {
        /// Details.
        message: String,
    },
    /// No such pair.
    NotFound {
        /// Details.
        message: String,
    },
}

struct PlannedLeg {
    symbol: Symbol,
    side: OrderSide,
    quantity: Decimal,
}

#[derive(Default)]
struct LegRun {
    filled: Vec<OrderFill>,
    failures: Vec<LegFailure>,
}

impl LegRun {
    fn fill_for(&self, symbol: &Symbol) -> Option<&OrderFill> {
        self.filled.iter().find(|f| &f.symbol == symbol)
    }
}

/// Coordinates both legs of a pair.
#[derive(Debug)]
pub struct PairCoordinator<B, P> {
    reconciler: FillReconciler<B>,
    pairs: Arc<P>,
}

impl<B, P> PairCoordinator<B, P>
where
    B: BrokerPort,
    P: PairedPositionRepository,
{
    /// Create a coordinator over the options reconciler.
    pub const fn new(reconciler: FillReconciler<B>, pairs: Arc<P>) -> Self {
        Self { reconciler, pairs }
    }

    /// Open a pair.
    ///
    /// # Errors
    ///
    /// Returns error only if the position store fails.
    pub async fn open(&self, request: &PairOpenRequest) -> Result<PairOutcome, PositionError> {
        if let Some(existing) = self.pairs.find_open_by_strategy(&request.strategy).await? {
            return Ok(PairOutcome::Conflict {
                message: format!(
                    "strategy {} already has open pair {}",
                    request.strategy, existing.id
                ),
            });
        }

        let state = PairState::None.transition(PairState::Opening)?;
        let planned: Vec<PlannedLeg> = [
            (&request.buy_symbol, OrderSide::Buy),
            (&request.sell_symbol, OrderSide::Sell),
        ]
        .into_iter()
        .filter(|(symbol, _)| !symbol.is_empty())
        .map(|(symbol, side)| PlannedLeg {
            symbol: symbol.clone(),
            side,
            quantity: request.quantity,
        })
        .collect();

        let run = self.run_legs(&planned, "pair-open").await;

        if !run.failures.is_empty() {
            let state = state.transition(PairState::None)?;
            tracing::error!(
                strategy = %request.strategy,
                state = %state,
                filled = run.filled.len(),
                failed = run.failures.len(),
                "Pair open failed"
            );
            return Ok(failure_outcome(run));
        }

        let sell_leg = entered_leg(&request.sell_symbol, &run);
        let buy_leg = entered_leg(&request.buy_symbol, &run);
        let pair = PairedPosition::open(
            request.strategy.clone(),
            request.reason.clone(),
            sell_leg,
            buy_leg,
            Utc::now(),
        );

        match self.pairs.insert_open(pair.clone()).await {
            Ok(_) => {
                let state = state.transition(PairState::Open)?;
                tracing::info!(strategy = %pair.strategy, pair_id = %pair.id, state = %state, "Pair opened");
                Ok(PairOutcome::Opened(pair))
            }
            Err(PositionError::Conflict { key }) => {
                tracing::error!(strategy = %request.strategy, key = %key, "Pair filled but another open pair was stored first");
                Ok(PairOutcome::PartialFailure {
                    filled: run.filled,
                    failures: vec![LegFailure {
                        symbol: Symbol::new(""),
                        side: OrderSide::Buy,
                        reason: format!("open pair already stored for {key}"),
                    }],
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Close the open pair for a strategy.
    ///
    /// # Errors
    ///
    /// Returns error only if the position store fails.
    pub async fn close_by_strategy(&self, strategy: &str) -> Result<PairOutcome, PositionError> {
        match self.pairs.find_open_by_strategy(strategy).await? {
            Some(pair) => self.close(pair).await,
            None => Ok(PairOutcome::NotFound {
                message: format!("no open pair for strategy {strategy}"),
            }),
        }
    }

    /// Close a pair by id.
    ///
    /// # Errors
    ///
    /// Returns error only if the position store fails.
    pub async fn close_by_id(&self, id: &PositionId) -> Result<PairOutcome, PositionError> {
        match self.pairs.find_by_id(id).await? {
            None => Ok(PairOutcome::NotFound {
                message: format!("no pair {id}"),
            }),
            Some(pair) if !pair.is_open() => Ok(PairOutcome::Conflict {
                message: format!("pair {id} is already closed"),
            }),
            Some(pair) => self.close(pair).await,
        }
    }

    /// Record a forced liquidation of one leg against its open pair.
    ///
    /// Closes the pair when no entered leg remains. Returns the updated pair,
    /// or `None` if no open pair holds the symbol.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn apply_liquidation(
        &self,
        fill: &OrderFill,
    ) -> Result<Option<PairedPosition>, PositionError> {
        let Some(pair) = self.pairs.find_open_by_leg(&fill.symbol).await? else {
            return Ok(None);
        };
        let Some(exit) = LegExit::from_fill(fill) else {
            return Ok(Some(pair));
        };

        let (sell_leg, buy_leg) = if pair.sell_leg.symbol == fill.symbol {
            (Some(exit), None)
        } else {
            (None, Some(exit))
        };
        let pair_exit = PairExit {
            sell_leg,
            buy_leg,
            exit_at: fill.filled_at.unwrap_or_else(Utc::now),
        };

        let mut projected = pair.clone();
        projected.record_leg_exits(pair_exit.clone())?;

        let updated = if projected.all_legs_exited() {
            self.pairs.close_pair(&pair.id, pair_exit).await?
        } else {
            self.pairs.record_partial_exit(&pair.id, pair_exit).await?
        };
        tracing::info!(
            pair_id = %updated.id,
            symbol = %fill.symbol,
            status = %updated.status,
            "Liquidated leg recorded on pair"
        );
        Ok(Some(updated))
    }

    async fn close(&self, pair: PairedPosition) -> Result<PairOutcome, PositionError> {
        let state = PairState::from(pair.status).transition(PairState::Closing)?;

        // Short leg is bought back before the long leg is sold.
        let planned: Vec<PlannedLeg> = [
            (&pair.sell_leg, OrderSide::Buy),
            (&pair.buy_leg, OrderSide::Sell),
        ]
        .into_iter()
        .filter(|(leg, _)| leg.needs_exit())
        .map(|(leg, side)| PlannedLeg {
            symbol: leg.symbol.clone(),
            side,
            quantity: leg.quantity,
        })
        .collect();

        let run = self.run_legs(&planned, "pair-close").await;

        let exit = PairExit {
            sell_leg: leg_exit(&pair.sell_leg, &run),
            buy_leg: leg_exit(&pair.buy_leg, &run),
            exit_at: Utc::now(),
        };

        if run.failures.is_empty() {
            let closed = self.pairs.close_pair(&pair.id, exit).await?;
            let state = state.transition(PairState::Closed)?;
            tracing::info!(strategy = %closed.strategy, pair_id = %closed.id, state = %state, "Pair closed");
            return Ok(PairOutcome::Closed(closed));
        }

        if !run.filled.is_empty() {
            self.pairs.record_partial_exit(&pair.id, exit).await?;
        }
        let state = state.transition(PairState::Open)?;
        tracing::error!(
            strategy = %pair.strategy,
            pair_id = %pair.id,
            state = %state,
            filled = run.filled.len(),
            failed = run.failures.len(),
            "Pair close failed"
        );
        Ok(failure_outcome(run))
    }

    /// Submit legs in order, stopping at the first rejected submission, then
    /// resolve every submitted leg from the symbol's order history.
    async fn run_legs(&self, legs: &[PlannedLeg], tag: &str) -> LegRun {
        let mut run = LegRun::default();
        let mut submitted = Vec::new();

        for leg in legs {
            let intent =
                OrderIntent::market(leg.symbol.clone(), leg.side, leg.quantity).with_tag(tag);
            match self.reconciler.submit(&intent).await {
                Ok(ack) => submitted.push((ack.broker_order_id, intent)),
                Err(e) => {
                    run.failures.push(LegFailure {
                        symbol: leg.symbol.clone(),
                        side: leg.side,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        for (order_id, intent) in submitted {
            let fill = self
                .reconciler
                .await_fill(&order_id, &intent, FillLookup::SymbolHistory)
                .await;
            if fill.status == FillStatus::Filled {
                run.filled.push(fill);
            } else {
                run.failures.push(LegFailure {
                    symbol: intent.symbol.clone(),
                    side: intent.side,
                    reason: format!("order {order_id} resolved as {}", fill.status),
                });
            }
        }

        run
    }
}

fn entered_leg(symbol: &Symbol, run: &LegRun) -> PairLeg {
    if symbol.is_empty() {
        PairLeg::absent()
    } else {
        PairLeg::from_entry(symbol.clone(), run.fill_for(symbol))
    }
}

fn leg_exit(leg: &PairLeg, run: &LegRun) -> Option<LegExit> {
    if !leg.needs_exit() {
        return None;
    }
    run.fill_for(&leg.symbol).and_then(LegExit::from_fill)
}

fn failure_outcome(run: LegRun) -> PairOutcome {
    if run.filled.is_empty() {
        PairOutcome::Failed {
            failures: run.failures,
        }
    } else {
        PairOutcome::PartialFailure {
            filled: run.filled,
            failures: run.failures,
        }
    }
}
