//! Mock broker for testing.
//!
//! Scriptable in-memory implementation of `BrokerPort`. Market orders fill
//! immediately at the configured price for their symbol (100 by default);
//! stop orders stay working until [`MockBroker::trigger_stop`] fills them.
//! Every call is recorded so tests can assert what reached the broker.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{
    BrokerError, BrokerPort, BrokerPosition, OrderAck, OrderQueryStatus, Quote,
};
use crate::domain::order_execution::{OrderIntent, OrderReport, OrderStatus, OrderType};
use crate::domain::shared::{BrokerOrderId, Symbol};

const DEFAULT_FILL_PRICE: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy)]
struct FillBehavior {
    status: OrderStatus,
    price: Option<Decimal>,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    intent: OrderIntent,
    report: OrderReport,
}

#[derive(Debug, Default)]
struct State {
    behaviors: HashMap<Symbol, FillBehavior>,
    submit_failures: HashMap<Symbol, VecDeque<BrokerError>>,
    persistent_failures: HashMap<Symbol, BrokerError>,
    submit_attempts: HashMap<Symbol, u32>,
    orders: Vec<StoredOrder>,
    canceled: Vec<BrokerOrderId>,
    cancel_failure: Option<BrokerError>,
    cancel_all_calls: u32,
    positions: Vec<BrokerPosition>,
    quotes: HashMap<Symbol, Quote>,
}

/// Mock broker for testing.
#[derive(Debug, Default)]
pub struct MockBroker {
    order_counter: AtomicU64,
    lookups: AtomicU32,
    submit_delay_ms: AtomicU64,
    state: Mutex<State>,
}

impl MockBroker {
    /// Create a mock broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// Market orders for `symbol` fill at `price`.
    pub fn set_fill_price(&self, symbol: &str, price: Decimal) {
        self.set_fill_status(symbol, OrderStatus::Filled, Some(price));
    }

    /// Market orders for `symbol` report `status` and `price`.
    pub fn set_fill_status(&self, symbol: &str, status: OrderStatus, price: Option<Decimal>) {
        self.state
            .lock()
            .behaviors
            .insert(Symbol::new(symbol), FillBehavior { status, price });
    }

    /// The next `count` submissions for `symbol` fail with `error`.
    pub fn fail_next_submissions(&self, symbol: &str, count: u32, error: BrokerError) {
        let mut state = self.state.lock();
        let queue = state.submit_failures.entry(Symbol::new(symbol)).or_default();
        for _ in 0..count {
            queue.push_back(error.clone());
        }
    }

    /// Every submission for `symbol` fails with `error`.
    pub fn fail_all_submissions(&self, symbol: &str, error: BrokerError) {
        self.state
            .lock()
            .persistent_failures
            .insert(Symbol::new(symbol), error);
    }

    /// Cancels fail with `error` until cleared with `None`.
    pub fn set_cancel_failure(&self, error: Option<BrokerError>) {
        self.state.lock().cancel_failure = error;
    }

    /// Delay every submission, to widen race windows in tests.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.submit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Replace the account positions.
    pub fn set_positions(&self, positions: Vec<BrokerPosition>) {
        self.state.lock().positions = positions;
    }

    /// Set the latest quote for a symbol.
    pub fn set_quote(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        let symbol = Symbol::new(symbol);
        self.state
            .lock()
            .quotes
            .insert(symbol.clone(), Quote::new(symbol, bid, ask));
    }

    /// Fill every working stop order for `symbol` at `price`.
    pub fn trigger_stop(&self, symbol: &str, price: Decimal) {
        let symbol = Symbol::new(symbol);
        let mut state = self.state.lock();
        for order in &mut state.orders {
            if order.intent.symbol == symbol
                && order.intent.order_type == OrderType::Stop
                && !order.report.status.is_terminal()
            {
                order.report.status = OrderStatus::Filled;
                order.report.filled_quantity = order.report.quantity;
                order.report.filled_avg_price = Some(price);
                order.report.filled_at = Some(Utc::now());
            }
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Intents the broker accepted, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<OrderIntent> {
        self.state
            .lock()
            .orders
            .iter()
            .map(|o| o.intent.clone())
            .collect()
    }

    /// Accepted intents for one symbol.
    #[must_use]
    pub fn submitted_for(&self, symbol: &str) -> Vec<OrderIntent> {
        let symbol = Symbol::new(symbol);
        self.submitted()
            .into_iter()
            .filter(|i| i.symbol == symbol)
            .collect()
    }

    /// Submission attempts for a symbol, including failed ones.
    #[must_use]
    pub fn submit_attempts(&self, symbol: &str) -> u32 {
        self.state
            .lock()
            .submit_attempts
            .get(&Symbol::new(symbol))
            .copied()
            .unwrap_or(0)
    }

    /// Orders canceled through `cancel_order`.
    #[must_use]
    pub fn canceled(&self) -> Vec<BrokerOrderId> {
        self.state.lock().canceled.clone()
    }

    /// Working stop orders, across all symbols.
    #[must_use]
    pub fn working_stops(&self) -> Vec<OrderReport> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.intent.order_type == OrderType::Stop && !o.report.status.is_terminal())
            .map(|o| o.report.clone())
            .collect()
    }

    /// Calls to `cancel_all_orders`.
    #[must_use]
    pub fn cancel_all_calls(&self) -> u32 {
        self.state.lock().cancel_all_calls
    }

    /// Order lookups made through `get_order` and `list_orders`.
    #[must_use]
    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn next_failure(state: &mut State, symbol: &Symbol) -> Option<BrokerError> {
        if let Some(error) = state.persistent_failures.get(symbol) {
            return Some(error.clone());
        }
        state
            .submit_failures
            .get_mut(symbol)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl BrokerPort for MockBroker {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck, BrokerError> {
        let delay = self.submit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut state = self.state.lock();
        *state
            .submit_attempts
            .entry(intent.symbol.clone())
            .or_default() += 1;

        if let Some(error) = Self::next_failure(&mut state, &intent.symbol) {
            return Err(error);
        }

        let id = BrokerOrderId::new(format!(
            "broker-{}",
            self.order_counter.fetch_add(1, Ordering::SeqCst) + 1
        ));

        let (status, price) = match intent.order_type {
            OrderType::Stop => (OrderStatus::Accepted, None),
            OrderType::Market => state.behaviors.get(&intent.symbol).map_or(
                (OrderStatus::Filled, Some(DEFAULT_FILL_PRICE)),
                |b| (b.status, b.price),
            ),
        };
        let filled = status == OrderStatus::Filled && price.is_some();

        let report = OrderReport {
            broker_order_id: id.clone(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            status,
            quantity: intent.quantity,
            filled_quantity: if filled { intent.quantity } else { Decimal::ZERO },
            filled_avg_price: price,
            filled_at: filled.then(Utc::now),
        };
        state.orders.push(StoredOrder {
            intent: intent.clone(),
            report,
        });
        drop(state);

        Ok(OrderAck {
            broker_order_id: id,
            client_order_id: intent.client_order_id.clone(),
            status: OrderStatus::Accepted,
        })
    }

    async fn get_order(&self, id: &BrokerOrderId) -> Result<Option<OrderReport>, BrokerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .lock()
            .orders
            .iter()
            .find(|o| &o.report.broker_order_id == id)
            .map(|o| o.report.clone()))
    }

    async fn list_orders(
        &self,
        symbol: &Symbol,
        status: OrderQueryStatus,
    ) -> Result<Vec<OrderReport>, BrokerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| &o.intent.symbol == symbol)
            .filter(|o| match status {
                OrderQueryStatus::Open => !o.report.status.is_terminal(),
                OrderQueryStatus::Closed => o.report.status.is_terminal(),
                OrderQueryStatus::All => true,
            })
            .map(|o| o.report.clone())
            .collect())
    }

    async fn cancel_order(&self, id: &BrokerOrderId) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        if let Some(error) = state.cancel_failure.clone() {
            return Err(error);
        }
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.report.broker_order_id == id)
            .ok_or_else(|| BrokerError::NotFound {
                resource: format!("order {id}"),
            })?;
        if !order.report.status.is_cancelable() {
            return Err(BrokerError::OrderRejected {
                reason: format!("order {id} is {:?}", order.report.status),
            });
        }
        order.report.status = OrderStatus::Canceled;
        state.canceled.push(id.clone());
        Ok(())
    }

    async fn cancel_all_orders(&self) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        state.cancel_all_calls += 1;
        for order in &mut state.orders {
            if order.report.status.is_cancelable() {
                order.report.status = OrderStatus::Canceled;
            }
        }
        Ok(())
    }

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        Ok(self.state.lock().positions.clone())
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, BrokerError> {
        self.state
            .lock()
            .quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound {
                resource: format!("quote {symbol}"),
            })
    }
}
