//! Time Sources
//!
//! `SntpClock` asks a network time server and falls back to the local clock.
//! `SystemClock` is the local clock. `FixedClock` is set by hand in tests.

mod fixed;
mod sntp;

pub use fixed::FixedClock;
pub use sntp::{SntpClock, SntpConfig, SystemClock};
