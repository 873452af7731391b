//! US equity/options trading-hours classification.
//!
//! Times are evaluated in US/Eastern. The UTC offset follows the US daylight
//! saving rule: EDT from the second Sunday of March 02:00 local to the first
//! Sunday of November 02:00 local, EST otherwise. Exchange holidays are not
//! modelled.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Trading session a point in time falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSession {
    /// 04:00 - 09:30 ET.
    PreMarket,
    /// 09:30 - 16:00 ET.
    Regular,
    /// 16:00 - 20:00 ET.
    AfterHours,
    /// Overnight and weekends.
    Closed,
}

impl MarketSession {
    /// Returns true if live quoting is permitted in this session.
    #[must_use]
    pub const fn allows_live_quotes(&self, include_extended: bool) -> bool {
        match self {
            Self::Regular => true,
            Self::PreMarket | Self::AfterHours => include_extended,
            Self::Closed => false,
        }
    }
}

const EST_OFFSET_HOURS: i64 = 5;
const EDT_OFFSET_HOURS: i64 = 4;

fn is_eastern_dst(utc: DateTime<Utc>) -> bool {
    let year = utc.year();
    let (Some(start), Some(end)) = (
        NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2),
        NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1),
    ) else {
        return false;
    };
    // 02:00 EST = 07:00 UTC, 02:00 EDT = 06:00 UTC
    let (Some(start), Some(end)) = (start.and_hms_opt(7, 0, 0), end.and_hms_opt(6, 0, 0)) else {
        return false;
    };
    let naive = utc.naive_utc();
    naive >= start && naive < end
}

/// Convert a UTC instant to US/Eastern wall-clock time.
#[must_use]
pub fn to_eastern(utc: DateTime<Utc>) -> NaiveDateTime {
    let offset = if is_eastern_dst(utc) {
        EDT_OFFSET_HOURS
    } else {
        EST_OFFSET_HOURS
    };
    utc.naive_utc() - TimeDelta::hours(offset)
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Classify a UTC instant into a trading session.
#[must_use]
pub fn classify_session(utc: DateTime<Utc>) -> MarketSession {
    let local = to_eastern(utc);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketSession::Closed;
    }

    let time = local.time();
    if time >= hm(9, 30) && time < hm(16, 0) {
        MarketSession::Regular
    } else if time >= hm(4, 0) && time < hm(9, 30) {
        MarketSession::PreMarket
    } else if time >= hm(16, 0) && time < hm(20, 0) {
        MarketSession::AfterHours
    } else {
        MarketSession::Closed
    }
}

/// Returns true during regular hours, or extended hours when opted in.
#[must_use]
pub fn is_market_hours(utc: DateTime<Utc>, include_extended: bool) -> bool {
    classify_session(utc).allows_live_quotes(include_extended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn summer_uses_edt() {
        // 2024-07-15 14:00 UTC = 10:00 EDT
        let local = to_eastern(utc(2024, 7, 15, 14, 0));
        assert_eq!(local.time(), hm(10, 0));
    }

    #[test]
    fn winter_uses_est() {
        // 2024-01-16 14:00 UTC = 09:00 EST
        let local = to_eastern(utc(2024, 1, 16, 14, 0));
        assert_eq!(local.time(), hm(9, 0));
    }

    #[test]
    fn dst_boundaries_2024() {
        // DST starts 2024-03-10 07:00 UTC, ends 2024-11-03 06:00 UTC
        assert!(!is_eastern_dst(utc(2024, 3, 10, 6, 59)));
        assert!(is_eastern_dst(utc(2024, 3, 10, 7, 0)));
        assert!(is_eastern_dst(utc(2024, 11, 3, 5, 59)));
        assert!(!is_eastern_dst(utc(2024, 11, 3, 6, 0)));
    }

    // Monday 2024-01-22, EST (UTC-5)
    #[test_case(utc(2024, 1, 22, 14, 29), MarketSession::PreMarket ; "one minute before open")]
    #[test_case(utc(2024, 1, 22, 14, 30), MarketSession::Regular ; "at open")]
    #[test_case(utc(2024, 1, 22, 20, 59), MarketSession::Regular ; "before close")]
    #[test_case(utc(2024, 1, 22, 21, 0), MarketSession::AfterHours ; "at close")]
    #[test_case(utc(2024, 1, 23, 1, 0), MarketSession::Closed ; "after extended close")]
    #[test_case(utc(2024, 1, 22, 8, 59), MarketSession::Closed ; "before pre market")]
    #[test_case(utc(2024, 1, 22, 9, 0), MarketSession::PreMarket ; "pre market open")]
    fn classifies_weekday_sessions(at: DateTime<Utc>, expected: MarketSession) {
        assert_eq!(classify_session(at), expected);
    }

    #[test]
    fn weekends_are_closed() {
        // Saturday 2024-01-20 15:00 UTC = 10:00 EST
        assert_eq!(classify_session(utc(2024, 1, 20, 15, 0)), MarketSession::Closed);
        assert!(!is_market_hours(utc(2024, 1, 20, 15, 0), true));
    }

    #[test]
    fn extended_hours_are_opt_in() {
        let after_close = utc(2024, 1, 22, 22, 0);
        assert!(!is_market_hours(after_close, false));
        assert!(is_market_hours(after_close, true));
    }
}
