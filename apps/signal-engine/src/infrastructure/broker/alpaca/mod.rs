//! Alpaca Markets Broker Adapter
//!
//! Implementation of `BrokerPort` for the Alpaca Markets API:
//! - One adapter per product account, each with its own key pair
//! - Environment-aware safety checks (PAPER vs LIVE)
//! - Stock and option quotes from the market data API
//! - Exactly one HTTP request per port call; callers own retries

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::AlpacaBrokerAdapter;
pub use api_types::PortfolioHistory;
pub use config::{AlpacaConfig, AlpacaEnvironment};
pub use error::AlpacaError;
