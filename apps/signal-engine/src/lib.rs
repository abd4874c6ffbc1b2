// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Signal Engine - Rust Core Library
//!
//! Turns buy/sell/open/close trading signals into Alpaca orders, resolves
//! what actually filled, and keeps positions protected until they close.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic, no I/O
//!   - `order_execution`: Order intents, broker reports, reconciled fills
//!   - `position`: Single-leg and paired positions, repository ports
//!   - `stop_enforcement`: Trailing floor and protective levels
//!   - `market_session`: Session hours and the option-expiry window
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerPort`, `SettingsPort`, `TimeSourcePort`)
//!   - `services`: Retry, fill reconciliation, protective orders, pair coordination, sentinel
//!   - `use_cases`: Equity, short-equity, and pair entry points behind `SignalEngine`
//!   - `dto`: Inbound signals and `{message, outcome}` results
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Alpaca REST adapter and an in-process mock
//!   - `persistence`: In-memory position, pair, and settings stores
//!   - `time`: SNTP, system, and fixed clocks
//!
//! - **Config** and **Observability**: YAML configuration, tracing, Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// YAML configuration.
pub mod config;

/// Structured logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{OrderIntent, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use domain::position::{PairedPosition, Position, TradingMode};
pub use domain::shared::{PositionId, ProductLine, Symbol};

// Application re-exports
pub use application::dto::{Outcome, PairedSignal, Signal, SignalOutcome};
pub use application::ports::{
    BrokerError, BrokerPort, SettingsPort, SignalHistoryPort, SignalRecord, TimeSourcePort,
};
pub use application::services::{Sentinel, SentinelConfig};
pub use application::use_cases::SignalEngine;
pub use application::{EngineContext, ExecutionPolicy, ProductBrokers};

// Infrastructure re-exports
pub use infrastructure::broker::{
    AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError, MockBroker,
};
pub use infrastructure::persistence::{
    InMemoryPairedPositionRepository, InMemoryPositionRepository, InMemorySettingsRepository,
    InMemorySignalHistory,
};

// Config re-exports
pub use config::{Config, ConfigError, load_config};
