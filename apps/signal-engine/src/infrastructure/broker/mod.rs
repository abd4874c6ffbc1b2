//! Broker Adapters
//!
//! `alpaca` talks to the Alpaca REST API, one adapter per product account.
//! `mock` is a scriptable in-process broker for tests and dry runs.

pub mod alpaca;
pub mod mock;

pub use alpaca::{AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError};
pub use mock::MockBroker;
