//! Time source configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::sentinel::default_true;
use crate::infrastructure::time::SntpConfig;

/// Network time settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Ask a network time server; otherwise use the local clock.
    #[serde(default = "default_true")]
    pub ntp_enabled: bool,
    /// `host:port` of the time server.
    #[serde(default = "default_ntp_server")]
    pub ntp_server: String,
    /// Round-trip budget in milliseconds.
    #[serde(default = "default_ntp_timeout_ms")]
    pub ntp_timeout_ms: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ntp_enabled: true,
            ntp_server: default_ntp_server(),
            ntp_timeout_ms: default_ntp_timeout_ms(),
        }
    }
}

impl TimeConfig {
    /// SNTP client settings.
    #[must_use]
    pub fn sntp(&self) -> SntpConfig {
        SntpConfig {
            server: self.ntp_server.clone(),
            timeout: Duration::from_millis(self.ntp_timeout_ms),
        }
    }
}

fn default_ntp_server() -> String {
    "pool.ntp.org:123".to_string()
}

const fn default_ntp_timeout_ms() -> u64 {
    2_000
}
