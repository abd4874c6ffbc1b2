//! Domain Layer - Core business logic with no I/O.
//!
//! # Bounded Contexts
//!
//! - `order_execution`: order intents, broker reports, reconciled fills
//! - `position`: single-leg and paired positions, repository ports
//! - `stop_enforcement`: trailing floor and protective levels
//! - `market_session`: session hours and option-expiry window
//! - `shared`: symbols, identifiers, domain errors

pub mod market_session;
pub mod order_execution;
pub mod position;
pub mod shared;
pub mod stop_enforcement;
