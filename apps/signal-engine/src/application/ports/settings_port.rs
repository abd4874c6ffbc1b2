//! Settings Port (Driven Port)
//!
//! Order sizing, protective thresholds, and the per-product kill switches.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::ProductLine;
use crate::domain::stop_enforcement::ProtectiveThresholds;

/// Order sizing and protective thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSettings {
    /// Shares per equity entry.
    pub stock_amount: Decimal,
    /// Contracts per option leg.
    pub options_amount: Decimal,
    /// Take-profit distance, in percent.
    pub profit_percent: Decimal,
    /// Stop-loss distance, in percent.
    pub loss_percent: Decimal,
}

impl TradingSettings {
    /// Protective thresholds derived from the settings.
    #[must_use]
    pub const fn thresholds(&self) -> ProtectiveThresholds {
        ProtectiveThresholds::new(self.profit_percent, self.loss_percent)
    }
}

/// Kill switches. A product whose switch is off ignores every signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartStopSettings {
    /// Equity signals enabled.
    pub stock_start: bool,
    /// Options signals enabled.
    pub options_start: bool,
    /// Short-equity signals enabled.
    pub short_stock_start: bool,
}

impl StartStopSettings {
    /// Whether signals for `product` are acted on.
    #[must_use]
    pub const fn is_started(&self, product: ProductLine) -> bool {
        match product {
            ProductLine::Equities => self.stock_start,
            ProductLine::Options => self.options_start,
            ProductLine::ShortEquities => self.short_stock_start,
        }
    }

    /// Flip one product's switch.
    pub fn set(&mut self, product: ProductLine, started: bool) {
        match product {
            ProductLine::Equities => self.stock_start = started,
            ProductLine::Options => self.options_start = started,
            ProductLine::ShortEquities => self.short_stock_start = started,
        }
    }
}

/// Settings store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Store unreachable or returned bad data.
    #[error("Settings unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for settings reads and kill-switch updates.
#[async_trait]
pub trait SettingsPort: Send + Sync {
    /// Current sizing and thresholds.
    async fn trading_settings(&self) -> Result<TradingSettings, SettingsError>;

    /// Current kill switches.
    async fn start_stop(&self) -> Result<StartStopSettings, SettingsError>;

    /// Turn a product on or off.
    async fn set_started(&self, product: ProductLine, started: bool) -> Result<(), SettingsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_are_independent() {
        let mut switches = StartStopSettings::default();
        switches.set(ProductLine::Options, true);
        assert!(switches.is_started(ProductLine::Options));
        assert!(!switches.is_started(ProductLine::Equities));
        assert!(!switches.is_started(ProductLine::ShortEquities));
    }
}
