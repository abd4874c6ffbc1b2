//! Inbound trading signals.
//!
//! Signals are validated here, at the boundary, into tagged variants. Two
//! legacy wire shapes are also accepted: the plain-text equity message
//!
//! ```text
//! buySignal
//! symbol : AAPL
//! quantity : 10
//! price : 187.12
//! ```
//!
//! and the options JSON payload with `sell_close` / `buy_close` legs.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::{DomainError, PositionId, Symbol};

/// Signal parsing and validation errors.
#[derive(Debug, Error)]
pub enum SignalParseError {
    /// The message had no action line.
    #[error("signal has no action")]
    MissingAction,

    /// The action was not recognised.
    #[error("unknown signal action: {0}")]
    UnknownAction(String),

    /// A required field was absent.
    #[error("signal is missing {0}")]
    MissingField(&'static str),

    /// A numeric field did not parse.
    #[error("invalid {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// JSON payload did not decode.
    #[error("invalid signal payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A field failed domain validation.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Direction of a single-symbol signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    /// Open (or add to) a position.
    #[serde(alias = "buySignal")]
    Buy,
    /// Close the position.
    #[serde(alias = "sellSignal")]
    Sell,
}

impl FromStr for SignalAction {
    type Err = SignalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "buy" | "buySignal" => Ok(Self::Buy),
            "sell" | "sellSignal" => Ok(Self::Sell),
            other => Err(SignalParseError::UnknownAction(other.to_string())),
        }
    }
}

/// Single-symbol signal (equities, short equities, manual trades).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquitySignal {
    /// Buy or sell.
    pub action: SignalAction,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Quantity; the configured amount applies when absent.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Price quoted by the signal source, informational only.
    #[serde(default)]
    pub price: Option<Decimal>,
}

fn field_regex(field: &str) -> &'static Regex {
    static SYMBOL: OnceLock<Regex> = OnceLock::new();
    static QUANTITY: OnceLock<Regex> = OnceLock::new();
    static PRICE: OnceLock<Regex> = OnceLock::new();

    let (cell, pattern) = match field {
        "symbol" => (&SYMBOL, r"symbol\s*:\s*(.+)"),
        "quantity" => (&QUANTITY, r"quantity\s*:\s*(.+)"),
        _ => (&PRICE, r"price\s*:\s*(.+)"),
    };
    #[allow(clippy::expect_used)]
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn capture<'a>(message: &'a str, field: &str) -> Option<&'a str> {
    field_regex(field)
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty())
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, SignalParseError> {
    Decimal::from_str(raw).map_err(|_| SignalParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

impl EquitySignal {
    /// Parse the plain-text signal format.
    ///
    /// # Errors
    ///
    /// Returns error if the action line or symbol is missing, or a number
    /// does not parse.
    pub fn parse_text(message: &str) -> Result<Self, SignalParseError> {
        let action_line = message
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or(SignalParseError::MissingAction)?;
        let action = action_line.parse::<SignalAction>()?;

        let symbol = capture(message, "symbol")
            .map(Symbol::new)
            .ok_or(SignalParseError::MissingField("symbol"))?;
        let quantity = capture(message, "quantity")
            .map(|q| parse_decimal("quantity", q))
            .transpose()?;
        let price = capture(message, "price")
            .map(|p| parse_decimal("price", p))
            .transpose()?;

        let signal = Self {
            action,
            symbol,
            quantity,
            price,
        };
        signal.validate()?;
        Ok(signal)
    }

    /// Validate symbol and quantity.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol is invalid or the quantity is not positive.
    pub fn validate(&self) -> Result<(), SignalParseError> {
        self.symbol.validate()?;
        if self.quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(DomainError::invalid("quantity", "must be positive").into());
        }
        Ok(())
    }
}

/// Open or close a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PairAction {
    /// Open the pair.
    #[serde(alias = "open")]
    Open,
    /// Close the pair.
    #[serde(alias = "close")]
    Close,
}

/// Two-leg options signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedSignal {
    /// Open or close.
    pub action: PairAction,
    /// Strategy name.
    pub strategy: String,
    /// Leg sold to open (bought to close). Empty when absent.
    #[serde(default = "empty_symbol")]
    pub sell_symbol: Symbol,
    /// Leg bought to open (sold to close). Empty when absent.
    #[serde(default = "empty_symbol")]
    pub buy_symbol: Symbol,
    /// Reason recorded with the pair.
    #[serde(default)]
    pub reason: String,
    /// Close a specific pair instead of the strategy's open one.
    #[serde(default)]
    pub pair_id: Option<PositionId>,
}

fn empty_symbol() -> Symbol {
    Symbol::new("")
}

impl PairedSignal {
    /// Parse the legacy options JSON payload.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not decode or fails validation.
    pub fn from_json(payload: &str) -> Result<Self, SignalParseError> {
        let legacy: OptionsSignal = serde_json::from_str(payload)?;
        let signal = Self::from(legacy);
        signal.validate()?;
        Ok(signal)
    }

    /// Validate the strategy and legs.
    ///
    /// # Errors
    ///
    /// Returns error if the strategy is empty, an opening signal has no legs,
    /// or a leg symbol is invalid.
    pub fn validate(&self) -> Result<(), SignalParseError> {
        if self.strategy.trim().is_empty() && self.pair_id.is_none() {
            return Err(SignalParseError::MissingField("strategy"));
        }
        if self.action == PairAction::Open && self.sell_symbol.is_empty() && self.buy_symbol.is_empty()
        {
            return Err(SignalParseError::MissingField("option legs"));
        }
        for leg in [&self.sell_symbol, &self.buy_symbol] {
            if !leg.is_empty() {
                leg.validate()?;
            }
        }
        Ok(())
    }
}

/// Legs of the legacy options payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionLegs {
    /// Symbol sold to open.
    #[serde(default)]
    pub sell_close: Option<String>,
    /// Symbol bought to open.
    #[serde(default)]
    pub buy_close: Option<String>,
}

/// Legacy options payload:
/// `{action, strategy, quantity, options: {sell_close, buy_close}, reason}`.
///
/// The payload's quantity is ignored; pairs trade the configured options
/// amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsSignal {
    /// `OPEN` or `CLOSE`.
    pub action: PairAction,
    /// Strategy name.
    pub strategy: String,
    /// Contract count sent by the source.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Leg symbols.
    #[serde(default)]
    pub options: OptionLegs,
    /// Reason.
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<OptionsSignal> for PairedSignal {
    fn from(legacy: OptionsSignal) -> Self {
        let leg = |s: Option<String>| Symbol::new(s.unwrap_or_default());
        Self {
            action: legacy.action,
            strategy: legacy.strategy,
            sell_symbol: leg(legacy.options.sell_close),
            buy_symbol: leg(legacy.options.buy_close),
            reason: legacy.reason.unwrap_or_default(),
            pair_id: None,
        }
    }
}

/// A validated inbound signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// Auto-managed long equity.
    Equity(EquitySignal),
    /// Short-equity account.
    ShortEquity(EquitySignal),
    /// Manual long equity; no protective orders.
    Manual(EquitySignal),
    /// Two-leg options pair.
    Paired(PairedSignal),
}

impl Signal {
    /// Validate whichever variant this is.
    ///
    /// # Errors
    ///
    /// Returns the variant's validation error.
    pub fn validate(&self) -> Result<(), SignalParseError> {
        match self {
            Self::Equity(s) | Self::ShortEquity(s) | Self::Manual(s) => s.validate(),
            Self::Paired(s) => s.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn parses_text_signal() {
        let signal =
            EquitySignal::parse_text("buySignal\nsymbol : aapl\nquantity : 10\nprice : 187.12")
                .unwrap();
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.symbol, Symbol::new("AAPL"));
        assert_eq!(signal.quantity, Some(dec!(10)));
        assert_eq!(signal.price, Some(dec!(187.12)));
    }

    #[test_case("sell\nsymbol : TSLA", SignalAction::Sell; "short form")]
    #[test_case("sellSignal\nsymbol : TSLA\n", SignalAction::Sell; "long form")]
    #[test_case("\n  buy\nsymbol : TSLA", SignalAction::Buy; "leading blank line")]
    fn text_actions(message: &str, expected: SignalAction) {
        let signal = EquitySignal::parse_text(message).unwrap();
        assert_eq!(signal.action, expected);
        assert_eq!(signal.quantity, None);
    }

    #[test]
    fn rejects_bad_text_signals() {
        assert!(matches!(
            EquitySignal::parse_text("hold\nsymbol : AAPL"),
            Err(SignalParseError::UnknownAction(_))
        ));
        assert!(matches!(
            EquitySignal::parse_text("buy\nquantity : 1"),
            Err(SignalParseError::MissingField("symbol"))
        ));
        assert!(matches!(
            EquitySignal::parse_text("buy\nsymbol : AAPL\nquantity : ten"),
            Err(SignalParseError::InvalidNumber { .. })
        ));
        assert!(EquitySignal::parse_text("buy\nsymbol : AAPL\nquantity : -1").is_err());
    }

    #[test]
    fn parses_legacy_options_payload() {
        let payload = r#"{
            "action": "OPEN",
            "strategy": "bull-call",
            "quantity": 3,
            "options": {"sell_close": "SPY240621C00455000", "buy_close": "SPY240621C00450000"},
            "reason": "breakout"
        }"#;
        let signal = PairedSignal::from_json(payload).unwrap();
        assert_eq!(signal.action, PairAction::Open);
        assert_eq!(signal.sell_symbol, Symbol::new("SPY240621C00455000"));
        assert_eq!(signal.buy_symbol, Symbol::new("SPY240621C00450000"));
        assert_eq!(signal.reason, "breakout");
    }

    #[test]
    fn legacy_payload_with_one_leg() {
        let payload = r#"{"action":"CLOSE","strategy":"s","options":{"buy_close":"SPY240621C00450000"}}"#;
        let signal = PairedSignal::from_json(payload).unwrap();
        assert!(signal.sell_symbol.is_empty());
    }

    #[test]
    fn open_without_legs_is_invalid() {
        let payload = r#"{"action":"OPEN","strategy":"s","options":{}}"#;
        assert!(matches!(
            PairedSignal::from_json(payload),
            Err(SignalParseError::MissingField(_))
        ));
    }

    #[test]
    fn tagged_signal_round_trip() {
        let json = r#"{"kind":"short_equity","action":"sell","symbol":"TSLA"}"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert!(matches!(signal, Signal::ShortEquity(ref s) if s.action == SignalAction::Sell));
        assert!(signal.validate().is_ok());
    }
}
