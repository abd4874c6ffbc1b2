//! Application Services
//!
//! Orchestration shared by the signal handlers and the sentinel: retries,
//! fill reconciliation, protective orders, pair coordination, and the
//! per-symbol session registry.

pub mod fill_reconciler;
pub mod pair_coordinator;
pub mod protective_orders;
pub mod retry;
pub mod sentinel;
pub mod session;

pub use fill_reconciler::{FillLookup, FillPollPolicy, FillReconciler, ReconcileError};
pub use pair_coordinator::{LegFailure, PairCoordinator, PairOpenRequest, PairOutcome};
pub use protective_orders::{
    ArmRequest, CancelFailurePolicy, ProtectiveOrderError, ProtectiveOrderManager, StopStatus,
};
pub use retry::{ExponentialBackoffCalculator, RetryError, RetryPolicy, retry_broker_call};
pub use sentinel::{Sentinel, SentinelConfig, SentinelError, TickReport};
pub use session::{InFlightGuard, SessionRegistry, SymbolSession};
