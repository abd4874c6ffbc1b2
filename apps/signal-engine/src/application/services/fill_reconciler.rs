//! Fill Reconciler
//!
//! Submits an order under the retry policy, waits for the broker to settle,
//! then polls until the order reaches a terminal state or the poll budget
//! runs out. Only a filled report with an average price counts as success.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::retry::{RetryError, RetryPolicy, retry_broker_call};
use crate::application::ports::{BrokerError, BrokerPort, OrderAck, OrderQueryStatus};
use crate::domain::order_execution::{FillStatus, OrderFill, OrderIntent, OrderReport};
use crate::domain::shared::{BrokerOrderId, DomainError, ProductLine};
use crate::observability::{record_fill_resolution, record_order_submission};

/// Bounded polling after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillPollPolicy {
    /// Wait before the first poll (default: 2s).
    pub settle_delay: Duration,
    /// Maximum number of polls (default: 5).
    pub max_polls: u32,
    /// Delay after the first unsuccessful poll (default: 500ms).
    pub poll_backoff: Duration,
    /// Cap on the delay between polls (default: 4s).
    pub max_poll_backoff: Duration,
}

impl Default for FillPollPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            max_polls: 5,
            poll_backoff: Duration::from_millis(500),
            max_poll_backoff: Duration::from_secs(4),
        }
    }
}

impl FillPollPolicy {
    /// No waiting between polls, for tests.
    #[must_use]
    pub const fn immediate(max_polls: u32) -> Self {
        Self {
            settle_delay: Duration::ZERO,
            max_polls,
            poll_backoff: Duration::ZERO,
            max_poll_backoff: Duration::ZERO,
        }
    }

    fn delay_after(&self, poll: u32) -> Duration {
        let factor = 2u32.saturating_pow(poll.saturating_sub(1));
        self.poll_backoff
            .saturating_mul(factor)
            .min(self.max_poll_backoff)
    }
}

/// How to look an order up after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillLookup {
    /// `get_order(id)`.
    ById,
    /// Scan the symbol's closed orders for the id.
    SymbolHistory,
}

/// Errors from submission and reconciliation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The intent failed validation; nothing was sent.
    #[error("invalid order: {0}")]
    InvalidIntent(#[from] DomainError),

    /// The submission loop gave up.
    #[error(transparent)]
    Submission(#[from] RetryError),

    /// The order was submitted but did not resolve to a priced fill.
    #[error("order {} for {} resolved as {}", .fill.broker_order_id, .fill.symbol, .fill.status)]
    Unresolved {
        /// Last known state of the order.
        fill: OrderFill,
    },
}

impl ReconcileError {
    /// The order that reached the broker, if submission succeeded.
    #[must_use]
    pub const fn submitted(&self) -> Option<&OrderFill> {
        match self {
            Self::Unresolved { fill } => Some(fill),
            _ => None,
        }
    }
}

/// Submits orders and resolves their fills for one product line.
#[derive(Debug)]
pub struct FillReconciler<B> {
    broker: Arc<B>,
    product: ProductLine,
    retry: RetryPolicy,
    poll: FillPollPolicy,
}

impl<B: BrokerPort> FillReconciler<B> {
    /// Create a reconciler.
    pub const fn new(
        broker: Arc<B>,
        product: ProductLine,
        retry: RetryPolicy,
        poll: FillPollPolicy,
    ) -> Self {
        Self {
            broker,
            product,
            retry,
            poll,
        }
    }

    /// Validate and submit under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIntent` before any broker call, or `Submission` when
    /// the retry loop gives up.
    pub async fn submit(&self, intent: &OrderIntent) -> Result<OrderAck, ReconcileError> {
        intent.validate()?;

        let result = retry_broker_call(&self.retry, "submit_order", |attempt| {
            tracing::debug!(
                symbol = %intent.symbol,
                side = %intent.side,
                client_order_id = %intent.client_order_id,
                attempt,
                "Submitting order"
            );
            self.broker.submit_order(intent)
        })
        .await;

        match result {
            Ok((ack, attempts)) => {
                record_order_submission(self.product.as_str(), "accepted", attempts);
                tracing::info!(
                    symbol = %intent.symbol,
                    side = %intent.side,
                    quantity = %intent.quantity,
                    broker_order_id = %ack.broker_order_id,
                    attempts,
                    "Order accepted"
                );
                Ok(ack)
            }
            Err(e) => {
                let status = match &e {
                    RetryError::NonRetryable { .. } => "rejected",
                    RetryError::Exhausted { .. } => "exhausted",
                    RetryError::DeadlineExceeded { .. } => "deadline",
                };
                record_order_submission(self.product.as_str(), status, e.attempts());
                tracing::warn!(symbol = %intent.symbol, error = %e, "Order submission failed");
                Err(e.into())
            }
        }
    }

    /// Poll until the order is terminal or the poll budget is spent.
    ///
    /// Lookup errors count as an unsuccessful poll. The settle delay holds
    /// no locks.
    pub async fn await_fill(
        &self,
        order_id: &BrokerOrderId,
        intent: &OrderIntent,
        lookup: FillLookup,
    ) -> OrderFill {
        tokio::time::sleep(self.poll.settle_delay).await;

        let mut last = OrderFill::timed_out(
            order_id.clone(),
            intent.symbol.clone(),
            intent.side,
            intent.quantity,
        );
        let mut polls = 0;

        while polls < self.poll.max_polls {
            polls += 1;
            match self.lookup(order_id, intent, lookup).await {
                Ok(Some(report)) => {
                    last = OrderFill::from_report(&report, intent.quantity);
                    if last.is_final() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(broker_order_id = %order_id, poll = polls, "Order not visible yet");
                }
                Err(e) => {
                    tracing::warn!(broker_order_id = %order_id, poll = polls, error = %e, "Order lookup failed");
                }
            }
            if polls < self.poll.max_polls {
                tokio::time::sleep(self.poll.delay_after(polls)).await;
            }
        }

        record_fill_resolution(&last.status.to_string(), polls);
        last
    }

    /// Submit and wait for a priced fill.
    ///
    /// # Errors
    ///
    /// Returns `Unresolved` when the order was sent but no priced fill was
    /// observed; the caller must not treat the position as entered.
    pub async fn resolve_fill(
        &self,
        intent: &OrderIntent,
        lookup: FillLookup,
    ) -> Result<OrderFill, ReconcileError> {
        let ack = self.submit(intent).await?;
        let fill = self.await_fill(&ack.broker_order_id, intent, lookup).await;

        if fill.status == FillStatus::Filled {
            Ok(fill)
        } else {
            tracing::error!(
                symbol = %intent.symbol,
                broker_order_id = %fill.broker_order_id,
                status = %fill.status,
                "Order did not resolve to a priced fill"
            );
            Err(ReconcileError::Unresolved { fill })
        }
    }

    async fn lookup(
        &self,
        order_id: &BrokerOrderId,
        intent: &OrderIntent,
        lookup: FillLookup,
    ) -> Result<Option<OrderReport>, BrokerError> {
        match lookup {
            FillLookup::ById => self.broker.get_order(order_id).await,
            FillLookup::SymbolHistory => {
                let history = self
                    .broker
                    .list_orders(&intent.symbol, OrderQueryStatus::Closed)
                    .await?;
                Ok(history
                    .into_iter()
                    .find(|report| &report.broker_order_id == order_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderSide, OrderStatus};
    use crate::domain::shared::Symbol;
    use crate::infrastructure::broker::MockBroker;
    use rust_decimal_macros::dec;

    fn reconciler(broker: Arc<MockBroker>) -> FillReconciler<MockBroker> {
        FillReconciler::new(
            broker,
            ProductLine::Equities,
            RetryPolicy::immediate(10),
            FillPollPolicy::immediate(3),
        )
    }

    fn buy() -> OrderIntent {
        OrderIntent::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(10))
    }

    #[tokio::test]
    async fn resolves_priced_fill() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_price("AAPL", dec!(100));

        let fill = reconciler(Arc::clone(&broker))
            .resolve_fill(&buy(), FillLookup::ById)
            .await
            .unwrap();

        assert_eq!(fill.status, FillStatus::Filled);
        assert_eq!(fill.price(), Some(dec!(100)));
        assert_eq!(broker.submitted().len(), 1);
    }

    #[tokio::test]
    async fn resolves_through_symbol_history() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_price("AAPL", dec!(99.5));

        let fill = reconciler(broker)
            .resolve_fill(&buy(), FillLookup::SymbolHistory)
            .await
            .unwrap();

        assert_eq!(fill.price(), Some(dec!(99.5)));
    }

    #[tokio::test]
    async fn filled_without_price_is_unresolved() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_status("AAPL", OrderStatus::Filled, None);

        let err = reconciler(broker)
            .resolve_fill(&buy(), FillLookup::ById)
            .await
            .unwrap_err();

        let fill = err.submitted().unwrap();
        assert_eq!(fill.status, FillStatus::TimedOut);
    }

    #[tokio::test]
    async fn working_order_times_out_after_poll_budget() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_status("AAPL", OrderStatus::Accepted, None);

        let err = reconciler(Arc::clone(&broker))
            .resolve_fill(&buy(), FillLookup::ById)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Unresolved { .. }));
        assert_eq!(broker.lookup_count(), 3);
    }

    #[tokio::test]
    async fn retries_transient_submission_failures() {
        let broker = Arc::new(MockBroker::new());
        broker.set_fill_price("AAPL", dec!(100));
        broker.fail_next_submissions("AAPL", 3, BrokerError::RateLimited);

        let fill = reconciler(Arc::clone(&broker))
            .resolve_fill(&buy(), FillLookup::ById)
            .await
            .unwrap();

        assert_eq!(fill.status, FillStatus::Filled);
        assert_eq!(broker.submit_attempts("AAPL"), 4);
    }

    #[tokio::test]
    async fn invalid_intent_never_reaches_broker() {
        let broker = Arc::new(MockBroker::new());
        let intent = OrderIntent::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(0));

        let err = reconciler(Arc::clone(&broker))
            .resolve_fill(&intent, FillLookup::ById)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidIntent(_)));
        assert_eq!(broker.submit_attempts("AAPL"), 0);
    }

    #[test]
    fn poll_backoff_is_capped() {
        let policy = FillPollPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_secs(1));
        assert_eq!(policy.delay_after(10), Duration::from_secs(4));
    }
}
