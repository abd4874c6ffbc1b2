//! Alpaca adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment for Alpaca API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlpacaEnvironment {
    /// Paper trading (simulated).
    Paper,
    /// Live trading (real money).
    Live,
}

impl AlpacaEnvironment {
    /// Get the base URL for the trading API.
    #[must_use]
    pub const fn trading_base_url(&self) -> &'static str {
        match self {
            Self::Paper => "https://paper-api.alpaca.markets",
            Self::Live => "https://api.alpaca.markets",
        }
    }

    /// Get the base URL for the market data API.
    #[must_use]
    pub const fn data_base_url(&self) -> &'static str {
        "https://data.alpaca.markets"
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for AlpacaEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Configuration for one Alpaca account.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// API key.
    pub api_key: String,
    /// API secret.
    pub api_secret: String,
    /// Trading environment.
    pub environment: AlpacaEnvironment,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Trading API override (tests, proxies).
    pub trading_url_override: Option<String>,
    /// Data API override.
    pub data_url_override: Option<String>,
}

impl AlpacaConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(api_key: String, api_secret: String, environment: AlpacaEnvironment) -> Self {
        Self {
            api_key,
            api_secret,
            environment,
            timeout: Duration::from_secs(30),
            trading_url_override: None,
            data_url_override: None,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point both APIs somewhere else.
    #[must_use]
    pub fn with_base_urls(mut self, trading: impl Into<String>, data: impl Into<String>) -> Self {
        self.trading_url_override = Some(trading.into());
        self.data_url_override = Some(data.into());
        self
    }

    /// Get the trading API base URL.
    #[must_use]
    pub fn trading_base_url(&self) -> &str {
        self.trading_url_override
            .as_deref()
            .unwrap_or_else(|| self.environment.trading_base_url())
    }

    /// Get the data API base URL.
    #[must_use]
    pub fn data_base_url(&self) -> &str {
        self.data_url_override
            .as_deref()
            .unwrap_or_else(|| self.environment.data_base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> AlpacaConfig {
        AlpacaConfig::new(
            "key".to_string(),
            "secret".to_string(),
            AlpacaEnvironment::Paper,
        )
    }

    #[test]
    fn paper_environment_urls() {
        let env = AlpacaEnvironment::Paper;
        assert!(env.trading_base_url().contains("paper"));
        assert!(!env.is_live());
    }

    #[test]
    fn live_environment_urls() {
        let env = AlpacaEnvironment::Live;
        assert!(!env.trading_base_url().contains("paper"));
        assert!(env.is_live());
    }

    #[test]
    fn config_defaults_to_environment_urls() {
        let config = paper();
        assert_eq!(config.trading_base_url(), "https://paper-api.alpaca.markets");
        assert_eq!(config.data_base_url(), "https://data.alpaca.markets");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn base_url_overrides_win() {
        let config = paper()
            .with_base_urls("http://127.0.0.1:9000", "http://127.0.0.1:9001")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.trading_base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.data_base_url(), "http://127.0.0.1:9001");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn environment_display_and_serde() {
        assert_eq!(format!("{}", AlpacaEnvironment::Paper), "PAPER");
        assert_eq!(format!("{}", AlpacaEnvironment::Live), "LIVE");
        let env: AlpacaEnvironment = serde_json::from_str("\"LIVE\"").unwrap();
        assert_eq!(env, AlpacaEnvironment::Live);
    }
}
