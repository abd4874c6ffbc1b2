//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `broker/`: Alpaca REST adapter per product account, plus a scriptable
//!   in-process broker
//! - `persistence/`: position, pair, and settings stores
//! - `time/`: network and local clocks

pub mod broker;
pub mod persistence;
pub mod time;
