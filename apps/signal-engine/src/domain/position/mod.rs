//! Position Bounded Context
//!
//! Single-leg positions, paired (two-leg) spread positions, their lifecycle
//! rules, and the repository ports that persist them.

pub mod entity;
pub mod errors;
pub mod paired;
pub mod repository;
pub mod value_objects;

pub use entity::{NewPosition, Position, PositionExit};
pub use errors::PositionError;
pub use paired::{LegExit, PairExit, PairLeg, PairedPosition};
pub use repository::{CloseOutcome, PairedPositionRepository, PositionRepository};
pub use value_objects::{PairState, PositionStatus, TradingMode};
