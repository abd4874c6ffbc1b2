//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A trading symbol (ticker or OCC option symbol).
///
/// Examples:
/// - Equity: "AAPL", "TQQQ"
/// - Option: "SPY240621C00450000" (OCC format)
///
/// An empty symbol is legal and marks an absent leg of a paired trade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, trimmed and normalized to uppercase.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no instrument is named (absent leg).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if this is an option symbol (OCC format).
    ///
    /// OCC format: `{ROOT}{YY}{MM}{DD}{P/C}{PRICE}`, where the strike is
    /// eight digits (strike x 1000).
    #[must_use]
    pub fn is_option(&self) -> bool {
        let s = self.0.as_bytes();
        let len = s.len();
        if !(16..=21).contains(&len) {
            return false;
        }
        let type_pos = len - 9;
        matches!(s[type_pos], b'P' | b'C')
            && s[len - 8..].iter().all(u8::is_ascii_digit)
            && s[type_pos - 6..type_pos].iter().all(u8::is_ascii_digit)
    }

    /// Validate the symbol for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if symbol is empty, too long, or contains invalid characters.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::invalid("symbol", "Symbol cannot be empty"));
        }
        if self.0.len() > 21 {
            return Err(DomainError::invalid("symbol", "Symbol exceeds maximum length"));
        }
        // Crypto pairs arrive as BTC/USD
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '.')
        {
            return Err(DomainError::invalid(
                "symbol",
                "Symbol contains invalid characters",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(Symbol::new("  aapl ").as_str(), "AAPL");
    }

    #[test]
    fn detects_occ_option() {
        assert!(Symbol::new("SPY240621C00450000").is_option());
        assert!(Symbol::new("AAPL250117P00190000").is_option());
        assert!(!Symbol::new("AAPL").is_option());
        assert!(!Symbol::new("SPY240621X00450000").is_option());
    }

    #[test]
    fn empty_symbol_is_absent_leg() {
        let symbol = Symbol::new("");
        assert!(symbol.is_empty());
        assert!(symbol.validate().is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(Symbol::new("AA PL").validate().is_err());
        assert!(Symbol::new("BTC/USD").validate().is_ok());
    }

    #[test]
    fn deserializes_normalized() {
        let symbol: Symbol = serde_json::from_str("\"tqqq\"").unwrap();
        assert_eq!(symbol.as_str(), "TQQQ");
    }
}
