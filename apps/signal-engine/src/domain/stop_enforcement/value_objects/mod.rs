//! Stop Enforcement Value Objects

mod protective_levels;
mod protective_order_state;
mod trailing_state;

pub use protective_levels::{ProtectiveLevels, ProtectiveThresholds};
pub use protective_order_state::ProtectiveOrderState;
pub use trailing_state::TrailingState;
