//! Shared engine context.
//!
//! Everything the signal handlers and the sentinel share: one broker per
//! product line, the position stores, settings, per-symbol sessions, and the
//! execution policies.

use std::sync::Arc;

use crate::application::ports::{BrokerPort, SettingsPort, SignalHistoryPort};
use crate::application::services::{
    CancelFailurePolicy, FillPollPolicy, FillReconciler, ProtectiveOrderManager, RetryPolicy,
    SessionRegistry,
};
use crate::domain::position::{PairedPositionRepository, PositionRepository};
use crate::domain::shared::ProductLine;

/// One broker client per product line, each with its own credentials.
#[derive(Debug)]
pub struct ProductBrokers<B> {
    /// Long equities.
    pub equities: Arc<B>,
    /// Options.
    pub options: Arc<B>,
    /// Short equities.
    pub short_equities: Arc<B>,
}

impl<B> ProductBrokers<B> {
    /// Create from three clients.
    pub const fn new(equities: Arc<B>, options: Arc<B>, short_equities: Arc<B>) -> Self {
        Self {
            equities,
            options,
            short_equities,
        }
    }

    /// Use one client for every product line.
    pub fn shared(broker: Arc<B>) -> Self {
        Self {
            equities: Arc::clone(&broker),
            options: Arc::clone(&broker),
            short_equities: broker,
        }
    }

    /// Client for a product line.
    #[must_use]
    pub const fn for_product(&self, product: ProductLine) -> &Arc<B> {
        match product {
            ProductLine::Equities => &self.equities,
            ProductLine::Options => &self.options,
            ProductLine::ShortEquities => &self.short_equities,
        }
    }
}

impl<B> Clone for ProductBrokers<B> {
    fn clone(&self) -> Self {
        Self {
            equities: Arc::clone(&self.equities),
            options: Arc::clone(&self.options),
            short_equities: Arc::clone(&self.short_equities),
        }
    }
}

/// Retry, polling, and cancel policies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPolicy {
    /// Submission retry policy.
    pub retry: RetryPolicy,
    /// Fill polling policy.
    pub fill_poll: FillPollPolicy,
    /// Behavior when a protective stop cannot be canceled.
    pub cancel_failure: CancelFailurePolicy,
}

/// Shared context for handlers and the sentinel.
#[derive(Debug)]
pub struct EngineContext<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Broker clients.
    pub brokers: ProductBrokers<B>,
    /// Single-leg positions.
    pub positions: Arc<R>,
    /// Paired positions.
    pub pairs: Arc<P>,
    /// Settings and kill switches.
    pub settings: Arc<S>,
    /// Per-symbol sessions and in-flight guards.
    pub sessions: Arc<SessionRegistry>,
    /// Execution policies.
    pub policy: ExecutionPolicy,
    /// Signal audit trail, if any.
    pub history: Option<Arc<dyn SignalHistoryPort>>,
}

impl<B, R, P, S> EngineContext<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Create a context with a fresh session registry.
    pub fn new(
        brokers: ProductBrokers<B>,
        positions: Arc<R>,
        pairs: Arc<P>,
        settings: Arc<S>,
        policy: ExecutionPolicy,
    ) -> Self {
        Self {
            brokers,
            positions,
            pairs,
            settings,
            sessions: Arc::new(SessionRegistry::new()),
            policy,
            history: None,
        }
    }

    /// Record handled signals to a history store.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn SignalHistoryPort>) -> Self {
        self.history = Some(history);
        self
    }

    /// Fill reconciler for a product line.
    pub fn reconciler(&self, product: ProductLine) -> FillReconciler<B> {
        FillReconciler::new(
            Arc::clone(self.brokers.for_product(product)),
            product,
            self.policy.retry.clone(),
            self.policy.fill_poll.clone(),
        )
    }

    /// Protective order manager; stops only protect long equities.
    pub fn protective(&self) -> ProtectiveOrderManager<B> {
        ProtectiveOrderManager::new(
            Arc::clone(&self.brokers.equities),
            self.policy.retry.clone(),
            self.policy.cancel_failure,
        )
    }
}
