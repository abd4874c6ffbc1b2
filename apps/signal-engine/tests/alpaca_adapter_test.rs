//! Alpaca Adapter Integration Tests
//!
//! Runs the REST adapter against a local mock server: request shape,
//! response decoding, error classification, and one full equity round trip
//! through the signal engine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;
use signal_engine::application::ports::{BrokerError, BrokerPort, OrderQueryStatus};
use signal_engine::application::services::{FillPollPolicy, RetryPolicy};
use signal_engine::domain::order_execution::{OrderIntent, OrderSide, OrderStatus};
use signal_engine::domain::shared::BrokerOrderId;
use signal_engine::{
    AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, EngineContext, ExecutionPolicy,
    InMemoryPairedPositionRepository, InMemoryPositionRepository, InMemorySettingsRepository,
    Outcome, ProductBrokers, ProductLine, SignalEngine, Symbol, TradingMode,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> AlpacaBrokerAdapter {
    let config = AlpacaConfig::new("key-id".into(), "secret".into(), AlpacaEnvironment::Paper)
        .with_base_urls(server.uri(), server.uri());
    AlpacaBrokerAdapter::new(&config, ProductLine::Equities).expect("should create adapter")
}

fn order_json(id: &str, status: &str, filled_qty: &str, price: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "client_order_id": "client-1",
        "symbol": "AAPL",
        "qty": "10",
        "filled_qty": filled_qty,
        "filled_avg_price": price,
        "status": status,
        "side": "buy",
        "type": "market",
        "filled_at": price.map(|_| "2024-06-21T14:30:00Z"),
    })
}

// ============================================
// Request Shape
// ============================================

#[tokio::test]
async fn submit_sends_credentials_and_order_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .and(header("APCA-API-KEY-ID", "key-id"))
        .and(header("APCA-API-SECRET-KEY", "secret"))
        .and(body_partial_json(json!({
            "symbol": "AAPL",
            "qty": "10",
            "side": "buy",
            "type": "market",
            "time_in_force": "day",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(
            "order-1", "accepted", "0", None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let intent = OrderIntent::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(10));
    let ack = adapter(&server).submit_order(&intent).await.unwrap();

    assert_eq!(ack.broker_order_id, BrokerOrderId::new("order-1"));
    assert_eq!(ack.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn stop_price_is_rounded_to_cents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .and(body_partial_json(json!({"type": "stop", "stop_price": "99.70"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(
            "stop-1", "new", "0", None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let intent = OrderIntent::stop(Symbol::new("AAPL"), OrderSide::Sell, dec!(10), dec!(99.7012));
    adapter(&server).submit_order(&intent).await.unwrap();
}

#[tokio::test]
async fn list_orders_filters_by_symbol_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/orders"))
        .and(query_param("status", "closed"))
        .and(query_param("symbols", "AAPL"))
        .and(query_param("direction", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            order_json("order-2", "filled", "10", Some("187.5")),
            order_json("order-1", "canceled", "0", None),
        ])))
        .mount(&server)
        .await;

    let reports = adapter(&server)
        .list_orders(&Symbol::new("AAPL"), OrderQueryStatus::Closed)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, OrderStatus::Filled);
    assert_eq!(reports[0].filled_avg_price, Some(dec!(187.5)));
    assert_eq!(reports[1].status, OrderStatus::Canceled);
}

// ============================================
// Response Decoding
// ============================================

#[tokio::test]
async fn get_order_returns_none_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": 40410000, "message": "order not found"})),
        )
        .mount(&server)
        .await;

    let report = adapter(&server)
        .get_order(&BrokerOrderId::new("missing"))
        .await
        .unwrap();

    assert!(report.is_none());
}

#[tokio::test]
async fn positions_keep_their_sign() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/positions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "symbol": "TSLA",
            "qty": "-12",
            "asset_class": "us_equity",
            "avg_entry_price": "250.10",
            "current_price": "248.00",
        }])))
        .mount(&server)
        .await;

    let positions = adapter(&server).list_positions().await.unwrap();

    assert_eq!(positions[0].symbol, Symbol::new("TSLA"));
    assert_eq!(positions[0].quantity, dec!(-12));
    assert_eq!(positions[0].current_price, Some(dec!(248)));
}

#[tokio::test]
async fn stock_quotes_come_from_the_data_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/stocks/AAPL/quotes/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "AAPL",
            "quote": {"bp": 187.1, "ap": 187.3, "bs": 2, "as": 3},
        })))
        .mount(&server)
        .await;

    let quote = adapter(&server).get_quote(&Symbol::new("AAPL")).await.unwrap();

    assert_eq!(quote.bid, dec!(187.1));
    assert_eq!(quote.ask, dec!(187.3));
}

#[tokio::test]
async fn option_quotes_are_keyed_by_contract() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta1/options/quotes/latest"))
        .and(query_param("symbols", "SPY240621P00540000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quotes": {"SPY240621P00540000": {"bp": 2.05, "ap": 2.15}},
        })))
        .mount(&server)
        .await;

    let quote = adapter(&server)
        .get_quote(&Symbol::new("SPY240621P00540000"))
        .await
        .unwrap();

    assert_eq!(quote.bid, dec!(2.05));
    assert_eq!(quote.ask, dec!(2.15));
}

#[tokio::test]
async fn portfolio_history_requests_the_intraday_curve() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/account/portfolio/history"))
        .and(query_param("intraday_reporting", "market_hours"))
        .and(query_param("pnl_reset", "per_day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timestamp": [1_718_976_600, 1_718_976_900],
            "equity": [100_000.0, 100_125.5],
            "profit_loss": [0, 125.5],
            "profit_loss_pct": [0, 0.001255],
            "base_value": 100_000,
            "timeframe": "5Min",
        })))
        .mount(&server)
        .await;

    let history = adapter(&server).portfolio_history().await.unwrap();

    assert_eq!(history.timestamp.len(), 2);
    assert_eq!(history.equity[1], Some(dec!(100125.5)));
    assert_eq!(history.base_value, Some(dec!(100000)));
    assert_eq!(history.timeframe, "5Min");
}

// ============================================
// Error Classification
// ============================================

#[tokio::test]
async fn rejection_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"code": 40310000, "message": "insufficient buying power"})),
        )
        .mount(&server)
        .await;

    let intent = OrderIntent::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(10));
    let err = adapter(&server).submit_order(&intent).await.unwrap_err();

    assert!(matches!(err, BrokerError::OrderRejected { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn server_errors_and_throttling_are_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/positions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let broker = adapter(&server);
    let unavailable = broker.list_positions().await.unwrap_err();
    let throttled = broker.cancel_all_orders().await.unwrap_err();

    assert!(matches!(
        unavailable,
        BrokerError::Unavailable { status: 503, .. }
    ));
    assert!(unavailable.is_retryable());
    assert_eq!(throttled, BrokerError::RateLimited);
}

#[tokio::test]
async fn bad_credentials_map_to_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/positions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "forbidden"})))
        .mount(&server)
        .await;

    let err = adapter(&server).list_positions().await.unwrap_err();

    assert_eq!(err, BrokerError::AuthenticationFailed);
}

#[tokio::test]
async fn undecodable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/positions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = adapter(&server).list_positions().await.unwrap_err();

    assert!(matches!(err, BrokerError::MalformedResponse { .. }));
}

// ============================================
// Engine Round Trip
// ============================================

#[tokio::test]
async fn equity_buy_records_fill_price_and_arms_stop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .and(body_partial_json(json!({"type": "market"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(
            "entry-1", "accepted", "0", None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/entry-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(
            "entry-1",
            "filled",
            "10",
            Some("200"),
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .and(body_partial_json(json!({
            "type": "stop",
            "side": "sell",
            "time_in_force": "gtc",
            "stop_price": "199.40",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(
            "stop-1", "new", "0", None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let broker = Arc::new(adapter(&server));
    let context = Arc::new(EngineContext::new(
        ProductBrokers::shared(broker),
        Arc::new(InMemoryPositionRepository::new()),
        Arc::new(InMemoryPairedPositionRepository::new()),
        Arc::new(InMemorySettingsRepository::default()),
        ExecutionPolicy {
            retry: RetryPolicy::immediate(2),
            fill_poll: FillPollPolicy::immediate(3),
            ..ExecutionPolicy::default()
        },
    ));
    let engine = SignalEngine::new(Arc::clone(&context));

    let outcome = engine.buy_equity(&Symbol::new("AAPL"), Some(dec!(10))).await;

    assert_eq!(outcome.outcome, Outcome::Executed, "{}", outcome.message);
    let positions = context.positions.all();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].entry_price, dec!(200));
    assert_eq!(positions[0].mode, TradingMode::Auto);
}
