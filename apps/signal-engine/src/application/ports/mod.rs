//! Application Ports (Driven)
//!
//! Interfaces the application uses to reach external systems: the broker,
//! the settings store, the signal history, and the clock.

mod broker_port;
mod settings_port;
mod signal_history_port;
mod time_source_port;

pub use broker_port::{
    AssetClass, BrokerError, BrokerPort, BrokerPosition, OrderAck, OrderQueryStatus, Quote,
};
pub use settings_port::{SettingsError, SettingsPort, StartStopSettings, TradingSettings};
pub use signal_history_port::{HistoryError, SignalHistoryPort, SignalRecord};
pub use time_source_port::TimeSourcePort;
