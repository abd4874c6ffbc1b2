//! Option expiry detection.

use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;

use super::calendar::SESSION_CLOSE_MINUTE;
use crate::domain::shared::Symbol;

/// The six-digit `YYMMDD` expiry code embedded in an option symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDateCode {
    code: String,
}

impl OptionDateCode {
    /// Two-digit year.
    #[must_use]
    pub fn year(&self) -> &str {
        &self.code[0..2]
    }

    /// Two-digit month.
    #[must_use]
    pub fn month(&self) -> &str {
        &self.code[2..4]
    }

    /// Two-digit day.
    #[must_use]
    pub fn day(&self) -> &str {
        &self.code[4..6]
    }

    /// Calendar expiration date, if the code names a real date.
    #[must_use]
    pub fn expiration_date(&self) -> Option<NaiveDate> {
        let year: i32 = self.year().parse().ok()?;
        let month: u32 = self.month().parse().ok()?;
        let day: u32 = self.day().parse().ok()?;
        NaiveDate::from_ymd_opt(2000 + year, month, day)
    }
}

/// Extract the date code: the six characters starting at the first digit.
///
/// Returns `None` for symbols without six consecutive digits at that point
/// (plain equities).
#[must_use]
pub fn parse_option_date(symbol: &str) -> Option<OptionDateCode> {
    let start = symbol.find(|c: char| c.is_ascii_digit())?;
    let code = symbol.get(start..start + 6)?;
    code.chars()
        .all(|c| c.is_ascii_digit())
        .then(|| OptionDateCode {
            code: code.to_string(),
        })
}

/// Forced liquidation window before the close on expiration day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryRule {
    cutoff_minutes: u32,
}

impl Default for ExpiryRule {
    fn default() -> Self {
        Self { cutoff_minutes: 40 }
    }
}

impl ExpiryRule {
    /// Create a rule liquidating `cutoff_minutes` before the close.
    #[must_use]
    pub const fn new(cutoff_minutes: u32) -> Self {
        Self { cutoff_minutes }
    }

    /// Minute of the local day at which liquidation starts.
    #[must_use]
    pub const fn cutoff_minute(&self) -> u32 {
        SESSION_CLOSE_MINUTE.saturating_sub(self.cutoff_minutes)
    }

    /// True if `symbol` expires today and `local` is inside the window
    /// `[close - cutoff, close]`.
    #[must_use]
    pub fn should_liquidate(&self, symbol: &Symbol, local: &DateTime<Tz>) -> bool {
        let Some(expiry) = parse_option_date(symbol.as_str()).and_then(|c| c.expiration_date())
        else {
            return false;
        };
        if local.date_naive() != expiry {
            return false;
        }
        let minute = local.hour() * 60 + local.minute();
        (self.cutoff_minute()..=SESSION_CLOSE_MINUTE).contains(&minute)
    }
}
