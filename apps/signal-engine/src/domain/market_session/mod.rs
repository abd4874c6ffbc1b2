//! Market Session Bounded Context
//!
//! Regular-session hours of the exchange and the option-expiry liquidation
//! window. All functions are pure; callers supply the current instant.

mod calendar;
mod expiry;

pub use calendar::{
    EXCHANGE_TZ, MarketSession, SESSION_CLOSE_MINUTE, SESSION_OPEN_MINUTE, is_market_open,
};
pub use expiry::{ExpiryRule, OptionDateCode, parse_option_date};
