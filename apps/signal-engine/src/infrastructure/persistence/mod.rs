//! Persistence Adapters
//!
//! In-memory implementations of the position, pair, settings, and signal
//! history stores.
//! Each applies its uniqueness rule under a single write lock, so the
//! check and the insert are one step.

pub mod in_memory;

pub use in_memory::{
    DEFAULT_HISTORY_CAPACITY, InMemoryPairedPositionRepository, InMemoryPositionRepository,
    InMemorySettingsRepository, InMemorySignalHistory,
};
