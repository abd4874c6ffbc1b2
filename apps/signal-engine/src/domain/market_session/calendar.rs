//! Regular trading session.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Exchange timezone.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Session open, in minutes after local midnight (09:30).
pub const SESSION_OPEN_MINUTE: u32 = 9 * 60 + 30;

/// Session close, in minutes after local midnight (16:00).
pub const SESSION_CLOSE_MINUTE: u32 = 16 * 60;

/// Snapshot of the session at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSession {
    /// The instant in exchange-local time.
    pub local_time: DateTime<Tz>,
    /// Whether the regular session is open.
    pub is_open: bool,
}

impl MarketSession {
    /// Evaluate the session at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        let local_time = now.with_timezone(&EXCHANGE_TZ);
        Self {
            local_time,
            is_open: is_market_open(&local_time),
        }
    }
}

/// Weekday and between 09:30 and 16:00 local, both ends inclusive at
/// minute resolution.
///
/// Exchange holidays are not modeled; the broker rejects or queues orders on
/// those days.
#[must_use]
pub fn is_market_open(local: &DateTime<Tz>) -> bool {
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let minute = local.hour() * 60 + local.minute();
    (SESSION_OPEN_MINUTE..=SESSION_CLOSE_MINUTE).contains(&minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn et(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Tz> {
        EXCHANGE_TZ.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
    }

    #[test_case(et(2024, 6, 22, 11, 0), false; "saturday midday")]
    #[test_case(et(2024, 6, 23, 10, 0), false; "sunday morning")]
    #[test_case(et(2024, 6, 18, 10, 0), true; "tuesday 10:00")]
    #[test_case(et(2024, 6, 18, 16, 1), false; "tuesday 16:01")]
    #[test_case(et(2024, 6, 18, 16, 0), true; "tuesday 16:00")]
    #[test_case(et(2024, 6, 18, 9, 29), false; "tuesday 09:29")]
    #[test_case(et(2024, 6, 18, 9, 30), true; "tuesday 09:30")]
    fn session_hours(local: DateTime<Tz>, expected: bool) {
        assert_eq!(is_market_open(&local), expected);
    }

    #[test]
    fn converts_utc_to_exchange_time() {
        // 14:00 UTC in June is 10:00 EDT
        let now = Utc.with_ymd_and_hms(2024, 6, 18, 14, 0, 0).unwrap();
        let session = MarketSession::at(now);
        assert_eq!(session.local_time.hour(), 10);
        assert!(session.is_open);
    }
}
