//! Stop Enforcement Bounded Context
//!
//! Protective level math for open single-leg positions: the ratcheting
//! trailing floor, stop-loss and take-profit prices, and the record of the
//! protective order currently working at the broker.

pub mod errors;
pub mod value_objects;

pub use errors::StopEnforcementError;
pub use value_objects::{ProtectiveLevels, ProtectiveOrderState, ProtectiveThresholds, TrailingState};
