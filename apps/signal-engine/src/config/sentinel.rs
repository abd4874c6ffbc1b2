//! Sentinel schedule configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::SentinelConfig;
use crate::domain::market_session::ExpiryRule;

/// Sentinel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelSettings {
    /// Run the sentinel.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Minutes before the close at which expiring options are liquidated.
    #[serde(default = "default_expiry_cutoff_minutes")]
    pub expiry_cutoff_minutes: u32,
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            expiry_cutoff_minutes: default_expiry_cutoff_minutes(),
        }
    }
}

impl SentinelSettings {
    /// Convert to the service config.
    #[must_use]
    pub const fn to_config(&self) -> SentinelConfig {
        SentinelConfig {
            enabled: self.enabled,
            interval: Duration::from_secs(self.interval_secs),
            expiry_rule: ExpiryRule::new(self.expiry_cutoff_minutes),
        }
    }
}

pub(super) const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    30
}

const fn default_expiry_cutoff_minutes() -> u32 {
    40
}
