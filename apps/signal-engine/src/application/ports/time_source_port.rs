//! Time Source Port (Driven Port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Infallible by contract: implementations backed by a network clock must
/// fall back to the local clock instead of failing.
#[async_trait]
pub trait TimeSourcePort: Send + Sync {
    /// Current time.
    async fn now(&self) -> DateTime<Utc>;
}
