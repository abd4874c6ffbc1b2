//! Broker configuration: one Alpaca account per product line.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::shared::ProductLine;
use crate::infrastructure::broker::{AlpacaConfig, AlpacaEnvironment};

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokersConfig {
    /// Long equity account.
    #[serde(default)]
    pub equities: AccountConfig,
    /// Options account.
    #[serde(default)]
    pub options: AccountConfig,
    /// Short equity account.
    #[serde(default)]
    pub short_equities: AccountConfig,
    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BrokersConfig {
    fn default() -> Self {
        Self {
            equities: AccountConfig::default(),
            options: AccountConfig::default(),
            short_equities: AccountConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Credentials and optional endpoint overrides for one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret.
    #[serde(default)]
    pub api_secret: String,
    /// Trading API override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Market data API override.
    #[serde(default)]
    pub data_url: Option<String>,
}

impl AccountConfig {
    /// True when both halves of the key pair are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl BrokersConfig {
    /// The account a product trades on.
    #[must_use]
    pub const fn for_product(&self, product: ProductLine) -> &AccountConfig {
        match product {
            ProductLine::Equities => &self.equities,
            ProductLine::Options => &self.options,
            ProductLine::ShortEquities => &self.short_equities,
        }
    }

    /// Adapter configuration for a product's account.
    #[must_use]
    pub fn alpaca_config(&self, product: ProductLine, environment: AlpacaEnvironment) -> AlpacaConfig {
        let account = self.for_product(product);
        let mut config = AlpacaConfig::new(
            account.api_key.clone(),
            account.api_secret.clone(),
            environment,
        )
        .with_timeout(Duration::from_millis(self.request_timeout_ms));
        config.trading_url_override = account.base_url.clone();
        config.data_url_override = account.data_url.clone();
        config
    }
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}
