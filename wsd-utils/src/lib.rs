//! Shared utility functions for WSD crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    /// Timestamp layouts seen in measurement exports, tried in order.
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    const MONTH_NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse a stored timestamp down to its calendar date.
    ///
    /// Accepts plain dates (`2020-01-01`, `20200101`), naive datetimes with
    /// a space or `T` separator, and RFC 3339 strings with an offset.
    pub fn parse_timestamp(s: &str) -> Result<NaiveDate, DateError> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Ok(date);
        }
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(dt.date());
            }
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.date_naive())
            .map_err(|_| DateError(format!("unrecognized timestamp '{}'", s)))
    }

    /// Convert unix seconds to a calendar date (UTC).
    pub fn date_from_unix_seconds(secs: i64) -> Result<NaiveDate, DateError> {
        DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DateError(format!("timestamp {} out of range", secs)))
    }

    /// English month name for a 1-based month number.
    pub fn month_name(month: u32) -> Option<&'static str> {
        MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
    }

    /// Number of calendar days covered by `start..=end`.
    pub fn span_days(start: &NaiveDate, end: &NaiveDate) -> i64 {
        (*end - *start).num_days() + 1
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_parse_timestamp_variants() {
            let expected = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            assert_eq!(parse_timestamp("2020-01-01").unwrap(), expected);
            assert_eq!(parse_timestamp("20200101").unwrap(), expected);
            assert_eq!(parse_timestamp("2020-01-01 10:15:00").unwrap(), expected);
            assert_eq!(parse_timestamp("2020-01-01T10:15:00.123").unwrap(), expected);
            assert_eq!(parse_timestamp("2020-01-01T23:15:00+00:00").unwrap(), expected);
            assert_eq!(parse_timestamp(" 2020-01-01 ").unwrap(), expected);
        }

        #[test]
        fn test_parse_timestamp_rejects_garbage() {
            assert!(parse_timestamp("not a date").is_err());
            assert!(parse_timestamp("").is_err());
            assert!(parse_timestamp("2020-13-01").is_err());
        }

        #[test]
        fn test_date_from_unix_seconds() {
            let date = date_from_unix_seconds(1_577_836_800).unwrap();
            assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        }

        #[test]
        fn test_month_name() {
            assert_eq!(month_name(1), Some("January"));
            assert_eq!(month_name(12), Some("December"));
            assert_eq!(month_name(0), None);
            assert_eq!(month_name(13), None);
        }

        #[test]
        fn test_span_days() {
            let a = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let b = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
            assert_eq!(span_days(&a, &a), 1);
            assert_eq!(span_days(&a, &b), 32);
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }
    }
}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
