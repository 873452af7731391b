//! Option expiration dates.
//!
//! Expirations travel on the wire as `YYYYMMDD` strings.

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};

use crate::domain::order_execution::OrderError;

/// Wire format for expiration dates.
pub const EXPIRATION_FORMAT: &str = "%Y%m%d";

/// Parse a `YYYYMMDD` expiration.
///
/// # Errors
///
/// Returns a validation error on `expiration` for anything that is not
/// eight digits forming a real calendar date.
pub fn parse_expiration(raw: &str) -> Result<NaiveDate, OrderError> {
    let raw = raw.trim();
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrderError::validation(
            "expiration",
            format!("expiration must be YYYYMMDD, got '{raw}'"),
        ));
    }
    NaiveDate::parse_from_str(raw, EXPIRATION_FORMAT).map_err(|e| {
        OrderError::validation("expiration", format!("invalid expiration '{raw}': {e}"))
    })
}

/// Format an expiration as `YYYYMMDD`.
#[must_use]
pub fn format_expiration(date: NaiveDate) -> String {
    date.format(EXPIRATION_FORMAT).to_string()
}

/// The nearest Friday on or after `date`. At the end of the calendar,
/// where no later Friday exists, `date` itself.
#[must_use]
pub fn closest_friday(date: NaiveDate) -> NaiveDate {
    let today = i64::from(date.weekday().num_days_from_monday());
    let friday = i64::from(Weekday::Fri.num_days_from_monday());
    date.checked_add_signed(TimeDelta::days((friday - today + 7) % 7))
        .unwrap_or(date)
}

fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3)
}

/// The standard monthly expiration (third Friday) on or after `date`.
#[must_use]
pub fn next_monthly_expiration(date: NaiveDate) -> NaiveDate {
    if let Some(this_month) = third_friday(date.year(), date.month())
        && date <= this_month
    {
        return this_month;
    }

    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    third_friday(year, month).unwrap_or_else(|| closest_friday(date))
}

/// The next `weeks` weekly expirations starting with the closest Friday,
/// stopping early at the end of the calendar.
#[must_use]
pub fn upcoming_expirations(date: NaiveDate, weeks: usize) -> Vec<NaiveDate> {
    let first = closest_friday(date);
    (0..weeks)
        .map_while(|week| {
            let offset = TimeDelta::try_weeks(i64::try_from(week).ok()?)?;
            first.checked_add_signed(offset)
        })
        .collect()
}

/// Serde adapter for `YYYYMMDD` dates.
pub mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize as `YYYYMMDD`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_expiration(*date))
    }

    /// Deserialize from `YYYYMMDD`.
    ///
    /// # Errors
    ///
    /// Fails on malformed dates.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_expiration(&raw).map_err(de::Error::custom)
    }

    /// Same as the parent module for `Option<NaiveDate>`.
    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer, de};

        /// Serialize as `YYYYMMDD` or null.
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => {
                    serializer.serialize_str(&super::super::format_expiration(*date))
                }
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize from `YYYYMMDD` or null.
        ///
        /// # Errors
        ///
        /// Fails on malformed dates.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_expiration(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test_case(date(2024, 1, 15), date(2024, 1, 19) ; "monday")]
    #[test_case(date(2024, 1, 19), date(2024, 1, 19) ; "friday is itself")]
    #[test_case(date(2024, 1, 20), date(2024, 1, 26) ; "saturday rolls to next week")]
    #[test_case(date(2024, 12, 30), date(2025, 1, 3) ; "crosses year end")]
    fn closest_friday_cases(from: NaiveDate, expected: NaiveDate) {
        assert_eq!(closest_friday(from), expected);
    }

    #[test_case(date(2024, 1, 1), date(2024, 1, 19) ; "before third friday")]
    #[test_case(date(2024, 1, 19), date(2024, 1, 19) ; "on third friday")]
    #[test_case(date(2024, 1, 22), date(2024, 2, 16) ; "after third friday")]
    #[test_case(date(2024, 12, 28), date(2025, 1, 17) ; "december rolls into january")]
    fn monthly_expiration_cases(from: NaiveDate, expected: NaiveDate) {
        assert_eq!(next_monthly_expiration(from), expected);
    }

    #[test]
    fn parses_and_formats_wire_dates() {
        let parsed = parse_expiration("20241220").unwrap();
        assert_eq!(parsed, date(2024, 12, 20));
        assert_eq!(format_expiration(parsed), "20241220");
    }

    #[test_case("2024-12-20" ; "dashed")]
    #[test_case("2024122" ; "too short")]
    #[test_case("20241340" ; "not a date")]
    #[test_case("" ; "empty")]
    fn rejects_malformed_expirations(raw: &str) {
        let err = parse_expiration(raw).unwrap_err();
        assert!(matches!(err, OrderError::Validation { ref field, .. } if field == "expiration"));
    }

    #[test]
    fn upcoming_expirations_are_consecutive_fridays() {
        let dates = upcoming_expirations(date(2024, 1, 16), 3);
        assert_eq!(
            dates,
            vec![date(2024, 1, 19), date(2024, 1, 26), date(2024, 2, 2)]
        );
        assert!(upcoming_expirations(date(2024, 1, 16), 0).is_empty());
    }

    #[test]
    fn calendar_end_cuts_expirations_short() {
        let dates = upcoming_expirations(NaiveDate::MAX - TimeDelta::days(20), 10);
        assert!(!dates.is_empty() && dates.len() < 10);
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Fri));
        assert_eq!(closest_friday(NaiveDate::MAX), NaiveDate::MAX);
    }

    #[test]
    fn serde_adapter_uses_wire_format() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "yyyymmdd")]
            expiration: NaiveDate,
        }

        let json = serde_json::to_string(&Wrapper {
            expiration: date(2024, 12, 20),
        })
        .unwrap();
        assert_eq!(json, r#"{"expiration":"20241220"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expiration, date(2024, 12, 20));
        assert!(serde_json::from_str::<Wrapper>(r#"{"expiration":"2024-12-20"}"#).is_err());
    }
}
