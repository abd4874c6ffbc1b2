//! Cross-field configuration checks.

use rust_decimal::Decimal;

use super::environment::VALID_MODES;
use super::{Config, ConfigError};
use crate::domain::shared::ProductLine;

/// Length of the regular session in minutes.
const SESSION_MINUTES: u32 = 390;

/// Validate configuration values.
pub(super) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !VALID_MODES.contains(&config.environment.mode.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "environment.mode must be one of: {VALID_MODES:?}"
        )));
    }

    let trading = &config.trading;
    if trading.profit_percent <= Decimal::ZERO || trading.loss_percent <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "trading.profit_percent and trading.loss_percent must be positive".to_string(),
        ));
    }
    if trading.loss_percent >= Decimal::ONE_HUNDRED {
        return Err(ConfigError::ValidationError(
            "trading.loss_percent must be below 100".to_string(),
        ));
    }
    if trading.stock_amount <= Decimal::ZERO || trading.options_amount <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "trading.stock_amount and trading.options_amount must be positive".to_string(),
        ));
    }

    if config.retry.max_attempts < 1 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.retry.multiplier < 1.0 || !(0.0..=1.0).contains(&config.retry.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "retry.multiplier must be >= 1.0 and retry.jitter_factor within 0.0..=1.0".to_string(),
        ));
    }
    if config.fill.max_polls < 1 {
        return Err(ConfigError::ValidationError(
            "fill.max_polls must be at least 1".to_string(),
        ));
    }

    if config.sentinel.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sentinel.interval_secs must be positive".to_string(),
        ));
    }
    if config.sentinel.expiry_cutoff_minutes >= SESSION_MINUTES {
        return Err(ConfigError::ValidationError(format!(
            "sentinel.expiry_cutoff_minutes must be below {SESSION_MINUTES}"
        )));
    }

    require_credentials(config)
}

/// Every started product needs a key pair for its account.
fn require_credentials(config: &Config) -> Result<(), ConfigError> {
    let switches = config.trading.switches();
    let missing: Vec<&str> = [
        ProductLine::Equities,
        ProductLine::Options,
        ProductLine::ShortEquities,
    ]
    .into_iter()
    .filter(|&product| {
        switches.is_started(product) && !config.brokers.for_product(product).has_credentials()
    })
    .map(|product| product.as_str())
    .collect();

    if missing.is_empty() {
        return Ok(());
    }
    Err(ConfigError::ValidationError(format!(
        "credentials missing for started products: {}. \
         Set them under brokers.<product> or via the referenced environment variables.",
        missing.join(", ")
    )))
}
