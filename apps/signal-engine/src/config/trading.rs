//! Initial trade settings and kill switches.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::ports::{StartStopSettings, TradingSettings};

/// Seed values for the settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Shares per equity entry when the signal has no quantity.
    #[serde(default = "default_amount")]
    pub stock_amount: Decimal,
    /// Contracts per option leg.
    #[serde(default = "default_amount")]
    pub options_amount: Decimal,
    /// Take-profit distance, in percent.
    #[serde(default = "default_profit_percent")]
    pub profit_percent: Decimal,
    /// Stop-loss distance, in percent.
    #[serde(default = "default_loss_percent")]
    pub loss_percent: Decimal,
    /// Equity signals enabled at startup.
    #[serde(default)]
    pub stock_start: bool,
    /// Options signals enabled at startup.
    #[serde(default)]
    pub options_start: bool,
    /// Short equity signals enabled at startup.
    #[serde(default)]
    pub short_stock_start: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            stock_amount: default_amount(),
            options_amount: default_amount(),
            profit_percent: default_profit_percent(),
            loss_percent: default_loss_percent(),
            stock_start: false,
            options_start: false,
            short_stock_start: false,
        }
    }
}

impl TradingConfig {
    /// Sizing and thresholds.
    #[must_use]
    pub const fn settings(&self) -> TradingSettings {
        TradingSettings {
            stock_amount: self.stock_amount,
            options_amount: self.options_amount,
            profit_percent: self.profit_percent,
            loss_percent: self.loss_percent,
        }
    }

    /// Kill switches.
    #[must_use]
    pub const fn switches(&self) -> StartStopSettings {
        StartStopSettings {
            stock_start: self.stock_start,
            options_start: self.options_start,
            short_stock_start: self.short_stock_start,
        }
    }
}

const fn default_amount() -> Decimal {
    dec!(1)
}

const fn default_profit_percent() -> Decimal {
    dec!(2)
}

const fn default_loss_percent() -> Decimal {
    dec!(0.3)
}
