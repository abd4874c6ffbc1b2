//! Protective Order Manager
//!
//! Keeps at most one working stop per open single-leg position. Re-arming
//! cancels the previous stop, then places a replacement at the recomputed
//! level. The take-profit level is computed and logged but never placed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::{RetryError, RetryPolicy, retry_broker_call};
use crate::application::ports::{BrokerError, BrokerPort};
use crate::domain::order_execution::{OrderFill, OrderIntent, OrderSide, OrderStatus};
use crate::domain::shared::{BrokerOrderId, DomainError, Symbol};
use crate::domain::stop_enforcement::{
    ProtectiveLevels, ProtectiveOrderState, ProtectiveThresholds, StopEnforcementError,
};

/// What to do when the previous stop cannot be canceled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelFailurePolicy {
    /// Log the failure and place the replacement anyway.
    #[default]
    Proceed,
    /// Keep the old stop and report the failure.
    Abort,
}

/// Inputs for arming a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmRequest {
    /// Symbol to protect.
    pub symbol: Symbol,
    /// Quantity held.
    pub quantity: Decimal,
    /// Ratcheted entry floor.
    pub entry_floor: Decimal,
    /// Highest price observed since entry.
    pub highest_price: Decimal,
    /// Profit and loss percentages.
    pub thresholds: ProtectiveThresholds,
    /// Stop currently working for the position, if any.
    pub previous_order_id: Option<BrokerOrderId>,
}

/// Broker-side state of an armed stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopStatus {
    /// Still working, or filled without a reported price yet.
    Working,
    /// Filled at a known price; the shares are already sold.
    Filled {
        /// Average fill price.
        price: Decimal,
        /// Fill time, when the broker reports one.
        filled_at: Option<DateTime<Utc>>,
    },
    /// Canceled, expired, rejected, or unknown to the broker.
    Gone,
}

/// Protective order errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtectiveOrderError {
    /// Levels could not be computed.
    #[error(transparent)]
    Levels(#[from] StopEnforcementError),

    /// The stop order failed validation.
    #[error("invalid stop order: {0}")]
    InvalidOrder(#[from] DomainError),

    /// The previous stop could not be canceled and the policy is `Abort`.
    #[error("failed to cancel stop {order_id}: {source}")]
    CancelFailed {
        /// Stop that is still working.
        order_id: BrokerOrderId,
        /// Broker failure.
        source: BrokerError,
    },

    /// The replacement stop was not accepted.
    #[error(transparent)]
    Submission(#[from] RetryError),
}

/// Arms and disarms protective stops.
#[derive(Debug)]
pub struct ProtectiveOrderManager<B> {
    broker: Arc<B>,
    retry: RetryPolicy,
    cancel_failure: CancelFailurePolicy,
}

impl<B: BrokerPort> ProtectiveOrderManager<B> {
    /// Create a manager.
    pub const fn new(broker: Arc<B>, retry: RetryPolicy, cancel_failure: CancelFailurePolicy) -> Self {
        Self {
            broker,
            retry,
            cancel_failure,
        }
    }

    /// Compute levels, replace the working stop, and return the new state.
    ///
    /// # Errors
    ///
    /// Returns error if levels are invalid, the cancel fails under
    /// `CancelFailurePolicy::Abort`, or the new stop is not accepted.
    pub async fn arm(&self, request: ArmRequest) -> Result<ProtectiveOrderState, ProtectiveOrderError> {
        let levels = ProtectiveLevels::compute(
            request.symbol.as_str(),
            request.entry_floor,
            request.highest_price,
            &request.thresholds,
        )?;

        if let Some(previous) = &request.previous_order_id {
            self.disarm(previous).await?;
        }

        let intent = OrderIntent::stop(
            request.symbol.clone(),
            OrderSide::Sell,
            request.quantity,
            levels.stop_loss,
        )
        .with_tag("stop");
        intent.validate()?;

        let (ack, attempts) =
            retry_broker_call(&self.retry, "submit_stop", |_| self.broker.submit_order(&intent))
                .await?;

        tracing::info!(
            symbol = %request.symbol,
            broker_order_id = %ack.broker_order_id,
            stop_loss = %levels.stop_loss,
            take_profit = %levels.take_profit,
            attempts,
            "Protective stop armed; take-profit is advisory"
        );

        Ok(ProtectiveOrderState::armed(
            request.symbol,
            Some(ack.broker_order_id),
            levels,
            Utc::now(),
        ))
    }

    /// Ask the broker what became of a stop.
    ///
    /// # Errors
    ///
    /// Returns error if the order lookup fails.
    pub async fn status(
        &self,
        order_id: &BrokerOrderId,
        quantity: Decimal,
    ) -> Result<StopStatus, BrokerError> {
        let Some(report) = self.broker.get_order(order_id).await? else {
            return Ok(StopStatus::Gone);
        };
        let fill = OrderFill::from_report(&report, quantity);
        if let Some(price) = fill.price() {
            return Ok(StopStatus::Filled {
                price,
                filled_at: fill.filled_at,
            });
        }
        if report.status.is_terminal() && report.status != OrderStatus::Filled {
            return Ok(StopStatus::Gone);
        }
        Ok(StopStatus::Working)
    }

    /// Cancel a working stop.
    ///
    /// An order the broker no longer knows counts as canceled.
    ///
    /// # Errors
    ///
    /// Returns `CancelFailed` only under `CancelFailurePolicy::Abort`.
    pub async fn disarm(&self, order_id: &BrokerOrderId) -> Result<(), ProtectiveOrderError> {
        match self.broker.cancel_order(order_id).await {
            Ok(()) => {
                tracing::debug!(broker_order_id = %order_id, "Protective stop canceled");
                Ok(())
            }
            Err(BrokerError::NotFound { .. }) => {
                tracing::debug!(broker_order_id = %order_id, "Protective stop already gone");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(
                    broker_order_id = %order_id,
                    error = %source,
                    policy = ?self.cancel_failure,
                    "Failed to cancel protective stop"
                );
                match self.cancel_failure {
                    CancelFailurePolicy::Proceed => Ok(()),
                    CancelFailurePolicy::Abort => Err(ProtectiveOrderError::CancelFailed {
                        order_id: order_id.clone(),
                        source,
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderType;
    use crate::infrastructure::broker::MockBroker;
    use rust_decimal_macros::dec;

    fn manager(broker: &Arc<MockBroker>, policy: CancelFailurePolicy) -> ProtectiveOrderManager<MockBroker> {
        ProtectiveOrderManager::new(Arc::clone(broker), RetryPolicy::immediate(3), policy)
    }

    fn request(previous: Option<BrokerOrderId>) -> ArmRequest {
        ArmRequest {
            symbol: Symbol::new("AAPL"),
            quantity: dec!(10),
            entry_floor: dec!(100),
            highest_price: dec!(100),
            thresholds: ProtectiveThresholds::new(dec!(2), dec!(0.3)),
            previous_order_id: previous,
        }
    }

    #[tokio::test]
    async fn arms_stop_at_loss_level() {
        let broker = Arc::new(MockBroker::new());
        let state = manager(&broker, CancelFailurePolicy::Proceed)
            .arm(request(None))
            .await
            .unwrap();

        assert_eq!(state.stop_price, dec!(99.70));
        assert_eq!(state.take_profit_price, dec!(102.00));

        let submitted = broker.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].order_type, OrderType::Stop);
        assert_eq!(submitted[0].side, OrderSide::Sell);
        assert_eq!(submitted[0].stop_price, Some(dec!(99.70)));
    }

    #[tokio::test]
    async fn rearm_cancels_previous_stop_first() {
        let broker = Arc::new(MockBroker::new());
        let manager = manager(&broker, CancelFailurePolicy::Proceed);
        let first = manager.arm(request(None)).await.unwrap();

        let second = manager.arm(request(first.active_order_id.clone())).await.unwrap();

        assert_eq!(broker.canceled(), vec![first.active_order_id.unwrap()]);
        assert_eq!(broker.working_stops().len(), 1);
        assert_ne!(second.active_order_id, None);
    }

    #[tokio::test]
    async fn cancel_failure_is_best_effort_by_default() {
        let broker = Arc::new(MockBroker::new());
        broker.set_cancel_failure(Some(BrokerError::Unavailable {
            status: 503,
            message: "down".to_string(),
        }));

        let state = manager(&broker, CancelFailurePolicy::Proceed)
            .arm(request(Some(BrokerOrderId::new("old"))))
            .await
            .unwrap();

        assert!(state.active_order_id.is_some());
    }

    #[tokio::test]
    async fn cancel_failure_aborts_when_configured() {
        let broker = Arc::new(MockBroker::new());
        broker.set_cancel_failure(Some(BrokerError::Unavailable {
            status: 503,
            message: "down".to_string(),
        }));

        let err = manager(&broker, CancelFailurePolicy::Abort)
            .arm(request(Some(BrokerOrderId::new("old"))))
            .await
            .unwrap_err();

        assert!(matches!(err, ProtectiveOrderError::CancelFailed { .. }));
        assert!(broker.submitted().is_empty());
    }

    #[tokio::test]
    async fn status_follows_the_broker_report() {
        let broker = Arc::new(MockBroker::new());
        let manager = manager(&broker, CancelFailurePolicy::Proceed);
        let state = manager.arm(request(None)).await.unwrap();
        let id = state.active_order_id.unwrap();

        assert_eq!(manager.status(&id, dec!(10)).await.unwrap(), StopStatus::Working);

        broker.trigger_stop("AAPL", dec!(99.68));
        assert!(matches!(
            manager.status(&id, dec!(10)).await.unwrap(),
            StopStatus::Filled { price, .. } if price == dec!(99.68)
        ));

        let second = manager.arm(request(None)).await.unwrap().active_order_id.unwrap();
        broker.cancel_order(&second).await.unwrap();
        assert_eq!(manager.status(&second, dec!(10)).await.unwrap(), StopStatus::Gone);
        assert_eq!(
            manager.status(&BrokerOrderId::new("unknown"), dec!(10)).await.unwrap(),
            StopStatus::Gone
        );
    }

    #[tokio::test]
    async fn missing_previous_stop_is_ignored() {
        let broker = Arc::new(MockBroker::new());
        let state = manager(&broker, CancelFailurePolicy::Abort)
            .arm(request(Some(BrokerOrderId::new("gone"))))
            .await
            .unwrap();
        assert!(state.active_order_id.is_some());
    }
}
