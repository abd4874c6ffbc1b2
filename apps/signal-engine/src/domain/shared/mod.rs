//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

pub mod errors;
pub mod identifiers;
pub mod product;
pub mod symbol;

pub use errors::DomainError;
pub use identifiers::{BrokerOrderId, ClientOrderId, PositionId};
pub use product::ProductLine;
pub use symbol::Symbol;
