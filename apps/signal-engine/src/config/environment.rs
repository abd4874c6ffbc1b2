//! Environment configuration for trading mode.

use serde::{Deserialize, Serialize};

use crate::infrastructure::broker::AlpacaEnvironment;

/// Accepted values for `environment.mode`.
pub const VALID_MODES: [&str; 2] = ["PAPER", "LIVE"];

/// Environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Trading mode: PAPER or LIVE.
    #[serde(default = "default_environment_mode")]
    pub mode: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            mode: default_environment_mode(),
        }
    }
}

impl EnvironmentConfig {
    /// Broker environment for the mode. Anything but LIVE trades paper.
    #[must_use]
    pub fn alpaca_environment(&self) -> AlpacaEnvironment {
        if self.mode.eq_ignore_ascii_case("LIVE") {
            AlpacaEnvironment::Live
        } else {
            AlpacaEnvironment::Paper
        }
    }
}

fn default_environment_mode() -> String {
    "PAPER".to_string()
}
