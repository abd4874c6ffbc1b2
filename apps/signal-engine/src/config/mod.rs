//! Configuration module for the signal engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before anything talks to a broker.
//!
//! # Usage
//!
//! ```rust,ignore
//! use signal_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("sentinel every {}s", config.sentinel.interval_secs);
//! ```

mod brokers;
mod environment;
mod execution;
mod observability;
mod sentinel;
mod time;
mod trading;
mod validation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use brokers::{AccountConfig, BrokersConfig};
pub use environment::EnvironmentConfig;
pub use execution::{FillConfig, ProtectiveConfig, RetryConfig, execution_policy};
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use sentinel::SentinelSettings;
pub use time::TimeConfig;
pub use trading::TradingConfig;

use crate::application::ExecutionPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Environment configuration.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Per-product broker accounts.
    #[serde(default)]
    pub brokers: BrokersConfig,
    /// Broker-call retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Fill polling settings.
    #[serde(default)]
    pub fill: FillConfig,
    /// Sentinel schedule.
    #[serde(default)]
    pub sentinel: SentinelSettings,
    /// Protective order settings.
    #[serde(default)]
    pub protective: ProtectiveConfig,
    /// Time source.
    #[serde(default)]
    pub time: TimeConfig,
    /// Initial trade settings and kill switches.
    #[serde(default)]
    pub trading: TradingConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Retry, polling, and cancel policies for the engine.
    #[must_use]
    pub const fn execution_policy(&self) -> ExecutionPolicy {
        execution_policy(&self.retry, &self.fill, &self.protective)
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}
