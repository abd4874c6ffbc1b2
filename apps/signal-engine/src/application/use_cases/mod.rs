//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod equity_position;
mod pair_trade;
mod short_equity;
mod signal_engine;

pub use equity_position::EquityPositionUseCase;
pub use pair_trade::{PairTarget, PairTradeUseCase};
pub use short_equity::ShortEquityUseCase;
pub use signal_engine::SignalEngine;

use crate::application::dto::{Outcome, SignalOutcome};
use crate::application::services::ReconcileError;
use crate::domain::shared::Symbol;

/// Map a reconciliation failure to a handler outcome.
fn reconcile_failure(symbol: &Symbol, error: &ReconcileError) -> SignalOutcome {
    match error {
        ReconcileError::Unresolved { fill } => SignalOutcome::new(
            Outcome::Unreconciled,
            format!(
                "order {} for {symbol} did not resolve to a priced fill ({})",
                fill.broker_order_id, fill.status
            ),
        ),
        ReconcileError::InvalidIntent(e) => SignalOutcome::invalid(e.to_string()),
        ReconcileError::Submission(e) => SignalOutcome::failed(format!("{symbol}: {e}")),
    }
}
