//! Calendar-date handling.
//!
//! Every date in the system is a plain calendar day. Clients send either
//! `YYYY-MM-DD` or a full RFC 3339 timestamp; both are normalised to a
//! `NaiveDate`, which serializes back as `YYYY-MM-DD`.

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Deserializer};

use crate::error::{GuidanceError, Result};

/// Wire format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Records enrolled within this many days may be removed by the deletion sweep.
pub const DELETION_WINDOW_DAYS: i64 = 30;

/// Parse a client-supplied date.
///
/// # Errors
///
/// Returns `GuidanceError::Validation` if the value is neither `YYYY-MM-DD`
/// nor an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.date_naive())
        .map_err(|_| GuidanceError::Validation(format!("invalid date: {raw:?}, expected YYYY-MM-DD")))
}

/// Whole days from `earlier` to `later` (negative if `later` comes first).
#[must_use]
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Serde adapter accepting any format understood by [`parse_date`].
///
/// # Errors
///
/// Fails deserialization when the string is not a recognised date.
pub fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

/// The open interval of enrollment dates the deletion sweep may remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionWindow {
    after: NaiveDate,
    before: NaiveDate,
}

impl DeletionWindow {
    /// The window ending at `today`: `(today - 30 days, today)`, both ends excluded.
    #[must_use]
    pub fn ending(today: NaiveDate) -> Self {
        Self {
            after: today - Duration::days(DELETION_WINDOW_DAYS),
            before: today,
        }
    }

    /// Exclusive lower bound.
    #[must_use]
    pub const fn after(&self) -> NaiveDate {
        self.after
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn before(&self) -> NaiveDate {
        self.before
    }

    /// Whether a record enrolled on `date` falls inside the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.after < date && date < self.before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_and_rfc3339_dates() {
        assert_eq!(parse_date("2024-01-01").unwrap(), ymd(2024, 1, 1));
        assert_eq!(parse_date(" 2024-02-05 ").unwrap(), ymd(2024, 2, 5));
        assert_eq!(
            parse_date("2024-03-10T18:30:00+05:30").unwrap(),
            ymd(2024, 3, 10)
        );
    }

    #[test]
    fn rejects_other_formats() {
        assert!(matches!(
            parse_date("01/02/2024"),
            Err(GuidanceError::Validation(_))
        ));
        assert!(parse_date("").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn counts_whole_days() {
        assert_eq!(days_between(ymd(2024, 1, 1), ymd(2024, 1, 20)), 19);
        assert_eq!(days_between(ymd(2024, 1, 1), ymd(2024, 2, 5)), 35);
        assert_eq!(days_between(ymd(2024, 2, 5), ymd(2024, 1, 1)), -35);
    }

    #[test]
    fn deletion_window_excludes_both_ends() {
        let window = DeletionWindow::ending(ymd(2024, 3, 31));
        assert_eq!(window.after(), ymd(2024, 3, 1));

        assert!(!window.contains(ymd(2024, 3, 1)));
        assert!(window.contains(ymd(2024, 3, 2)));
        assert!(window.contains(ymd(2024, 3, 30)));
        assert!(!window.contains(ymd(2024, 3, 31)));
        assert!(!window.contains(ymd(2024, 4, 1)));
    }
}
