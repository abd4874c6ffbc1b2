//! Position store errors.

use thiserror::Error;

use crate::domain::shared::DomainError;

/// Errors from position persistence and lifecycle rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// An open record already exists for the key.
    #[error("Open position already exists for {key}")]
    Conflict {
        /// Uniqueness key (symbol/mode or pair strategy).
        key: String,
    },

    /// No matching record.
    #[error("Position not found: {key}")]
    NotFound {
        /// Lookup key.
        key: String,
    },

    /// The record is not in a state that allows the change.
    #[error(transparent)]
    Lifecycle(#[from] DomainError),

    /// Backing store failed.
    #[error("Position store error: {message}")]
    Storage {
        /// Error details.
        message: String,
    },
}
