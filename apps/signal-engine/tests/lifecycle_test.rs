//! Position Lifecycle Integration Tests
//!
//! Drives the signal engine and the sentinel together over the mock broker:
//! concurrent signals, trailing stops, broker-fired exits, and the
//! stop-ratchet property.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_engine::application::dto::PairAction;
use signal_engine::application::services::{FillPollPolicy, RetryPolicy};
use signal_engine::domain::order_execution::OrderType;
use signal_engine::domain::position::PositionRepository;
use signal_engine::domain::stop_enforcement::{
    ProtectiveLevels, ProtectiveThresholds, TrailingState,
};
use signal_engine::infrastructure::time::FixedClock;
use signal_engine::{
    EngineContext, ExecutionPolicy, InMemoryPairedPositionRepository, InMemoryPositionRepository,
    InMemorySettingsRepository, MockBroker, Outcome, PairedSignal, ProductBrokers, Sentinel,
    SentinelConfig, SignalEngine, Symbol, TradingMode,
};
use tokio_util::sync::CancellationToken;

type TestContext = EngineContext<
    MockBroker,
    InMemoryPositionRepository,
    InMemoryPairedPositionRepository,
    InMemorySettingsRepository,
>;

struct Harness {
    broker: Arc<MockBroker>,
    context: Arc<TestContext>,
    engine: SignalEngine<
        MockBroker,
        InMemoryPositionRepository,
        InMemoryPairedPositionRepository,
        InMemorySettingsRepository,
    >,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new() -> Self {
        let broker = Arc::new(MockBroker::new());
        let context = Arc::new(EngineContext::new(
            ProductBrokers::shared(Arc::clone(&broker)),
            Arc::new(InMemoryPositionRepository::new()),
            Arc::new(InMemoryPairedPositionRepository::new()),
            Arc::new(InMemorySettingsRepository::default()),
            ExecutionPolicy {
                retry: RetryPolicy::immediate(3),
                fill_poll: FillPollPolicy::immediate(2),
                ..ExecutionPolicy::default()
            },
        ));
        // Friday 2024-06-21 14:00 ET, before the expiry cutoff
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 21, 18, 0, 0).unwrap(),
        ));
        Self {
            engine: SignalEngine::new(Arc::clone(&context)),
            broker,
            context,
            clock,
        }
    }

    fn sentinel(&self, config: SentinelConfig) -> Sentinel<
        MockBroker,
        InMemoryPositionRepository,
        InMemoryPairedPositionRepository,
        InMemorySettingsRepository,
        FixedClock,
    > {
        Sentinel::new(Arc::clone(&self.context), Arc::clone(&self.clock), config)
    }
}

fn pair(strategy: &str, sell: &str, buy: &str) -> PairedSignal {
    PairedSignal {
        action: PairAction::Open,
        strategy: strategy.to_string(),
        sell_symbol: Symbol::new(sell),
        buy_symbol: Symbol::new(buy),
        reason: String::new(),
        pair_id: None,
    }
}

// ============================================
// Concurrency
// ============================================

#[tokio::test]
async fn concurrent_buys_open_one_position() {
    let h = Harness::new();
    h.broker.set_submit_delay(Duration::from_millis(30));
    let symbol = Symbol::new("AAPL");

    let (first, second) = tokio::join!(
        h.engine.buy_equity(&symbol, None),
        h.engine.buy_equity(&symbol, None)
    );

    let mut outcomes = [first.outcome, second.outcome];
    outcomes.sort_by_key(|o| *o != Outcome::Executed);
    assert_eq!(outcomes, [Outcome::Executed, Outcome::Conflict]);
    assert_eq!(h.context.positions.len(), 1);
    let entries = h
        .broker
        .submitted_for("AAPL")
        .into_iter()
        .filter(|i| i.order_type == OrderType::Market)
        .count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn pairs_sharing_a_leg_do_not_interleave() {
    let h = Harness::new();
    h.broker.set_submit_delay(Duration::from_millis(30));

    let pair_a = pair("a", "SPY240621P00540000", "SPY240621P00530000");
    let pair_b = pair("b", "SPY240621P00540000", "SPY240621P00520000");
    let (a, b) = tokio::join!(h.engine.open_pair(&pair_a), h.engine.open_pair(&pair_b));

    let executed = [&a, &b].iter().filter(|o| o.is_executed()).count();
    let conflicts = [&a, &b]
        .iter()
        .filter(|o| o.outcome == Outcome::Conflict)
        .count();
    assert_eq!((executed, conflicts), (1, 1));
    assert_eq!(h.broker.submitted().len(), 2);
}

#[tokio::test]
async fn independent_symbols_trade_concurrently() {
    let h = Harness::new();
    h.broker.set_submit_delay(Duration::from_millis(10));

    let aapl = Symbol::new("AAPL");
    let msft = Symbol::new("MSFT");
    let (a, b) = tokio::join!(
        h.engine.buy_equity(&aapl, None),
        h.engine.buy_equity(&msft, None)
    );

    assert!(a.is_executed() && b.is_executed());
    assert_eq!(h.context.positions.len(), 2);
}

// ============================================
// Engine + Sentinel
// ============================================

#[tokio::test]
async fn trailing_stop_follows_price_then_closes_position() {
    let h = Harness::new();
    let sentinel = h.sentinel(SentinelConfig::default());
    let symbol = Symbol::new("AAPL");
    h.broker.set_fill_price("AAPL", dec!(100));

    assert!(h.engine.buy_equity(&symbol, Some(dec!(10))).await.is_executed());
    assert_eq!(h.broker.working_stops().len(), 1);

    h.broker.set_quote("AAPL", dec!(110), dec!(110));
    let report = sentinel.tick().await;
    assert_eq!(report.rearmed, vec![symbol.clone()]);
    let stops = h.broker.working_stops();
    assert_eq!(stops.len(), 1);
    assert_eq!(h.broker.canceled().len(), 1);

    h.broker.set_quote("AAPL", dec!(108), dec!(108));
    let report = sentinel.tick().await;
    assert!(report.rearmed.is_empty());

    h.broker.trigger_stop("AAPL", dec!(109.67));
    let report = sentinel.tick().await;
    assert_eq!(report.closed_by_stop, vec![symbol.clone()]);

    let closed = h
        .context
        .positions
        .all()
        .into_iter()
        .find(|p| p.symbol == symbol)
        .unwrap();
    assert_eq!(closed.exit_price, Some(dec!(109.67)));
    assert!(
        h.context
            .positions
            .find_open(&symbol, TradingMode::Auto)
            .await
            .unwrap()
            .is_none()
    );

    let before = h.broker.submitted().len();
    let outcome = h.engine.sell_equity(&symbol).await;
    assert_eq!(outcome.outcome, Outcome::NotFound);
    assert_eq!(h.broker.submitted().len(), before);
}

#[tokio::test]
async fn manual_positions_are_left_alone_by_the_sentinel() {
    let h = Harness::new();
    let sentinel = h.sentinel(SentinelConfig::default());
    h.engine.open_manual(&Symbol::new("AAPL"), None).await;
    h.broker.set_quote("AAPL", dec!(150), dec!(150));

    let report = sentinel.tick().await;

    assert!(report.rearmed.is_empty());
    assert!(h.broker.working_stops().is_empty());
}

#[tokio::test]
async fn spawned_sentinel_exits_on_cancel() {
    let h = Harness::new();
    let sentinel = Arc::new(h.sentinel(SentinelConfig {
        interval: Duration::from_millis(5),
        ..SentinelConfig::default()
    }));
    let shutdown = CancellationToken::new();
    let handle = sentinel.spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sentinel should stop promptly")
        .expect("sentinel task should not panic");
}

// ============================================
// Properties
// ============================================

fn price() -> impl Strategy<Value = Decimal> {
    (100u32..100_000).prop_map(|cents| Decimal::new(i64::from(cents), 2))
}

proptest! {
    /// The floor and the stop derived from it never move down.
    #[test]
    fn stop_never_ratchets_down(entry in price(), observed in prop::collection::vec(price(), 1..40)) {
        let thresholds = ProtectiveThresholds::new(dec!(2), dec!(0.3));
        let mut trailing = TrailingState::new(entry);
        let mut last_floor = trailing.entry_floor();
        let mut last_stop = ProtectiveLevels::compute("AAPL", last_floor, entry, &thresholds)
            .unwrap()
            .stop_loss;

        for p in observed {
            let floor = trailing.observe(p);
            let stop = ProtectiveLevels::compute("AAPL", floor, trailing.highest_price(), &thresholds)
                .unwrap()
                .stop_loss;
            prop_assert!(floor >= last_floor);
            prop_assert!(floor >= entry);
            prop_assert!(stop >= last_stop);
            prop_assert!(stop <= floor);
            last_floor = floor;
            last_stop = stop;
        }
    }
}
