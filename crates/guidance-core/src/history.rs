//! Re-enrollment history.
//!
//! One row per student phone, carrying the roster profile fields plus a
//! counter of re-enrollments and the date of the last (re-)enrollment. A new
//! re-enrollment is admitted only when at least [`REENROLLMENT_MIN_DAYS`]
//! whole days have passed since that date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::days_between;
use crate::error::{GuidanceError, Result};
use crate::ids::{Email, Phone};
use crate::student::{linkage, NewStudent};

/// Minimum whole days between two enrollments of the same phone.
pub const REENROLLMENT_MIN_DAYS: i64 = 30;

/// A history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Surrogate row ID.
    pub id: i64,
    /// Student name.
    pub name: String,
    /// Phone number; the natural key for history lookups.
    pub phone: Phone,
    /// Contact email.
    pub email: Email,
    /// Date of the last enrollment or re-enrollment.
    pub date: NaiveDate,
    /// School class or grade.
    pub class: String,
    /// Subscription tier.
    pub sub: String,
    /// Mentor linkage, mirrored from the roster.
    #[serde(rename = "mentorName", with = "linkage", default)]
    pub mentor: Option<String>,
    /// Number of re-enrollments so far.
    pub renrollment: i32,
}

/// A re-enrollment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReEnrollment {
    /// Student name.
    pub name: String,
    /// Phone number.
    pub phone: Phone,
    /// Contact email.
    pub email: Email,
    /// New enrollment date.
    pub date: NaiveDate,
    /// School class or grade.
    pub class: String,
    /// Subscription tier.
    pub sub: String,
}

/// Field values for a history row that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistory {
    /// Student name.
    pub name: String,
    /// Phone number.
    pub phone: Phone,
    /// Contact email.
    pub email: Email,
    /// Enrollment date.
    pub date: NaiveDate,
    /// School class or grade.
    pub class: String,
    /// Subscription tier.
    pub sub: String,
    /// Mentor linkage.
    pub mentor: Option<String>,
    /// Starting counter value.
    pub renrollment: i32,
}

impl From<&NewStudent> for NewHistory {
    fn from(student: &NewStudent) -> Self {
        Self {
            name: student.name.clone(),
            phone: student.phone.clone(),
            email: student.email.clone(),
            date: student.date,
            class: student.class.clone(),
            sub: student.sub.clone(),
            mentor: None,
            renrollment: 0,
        }
    }
}

impl HistoryRecord {
    /// Refresh the row for a fresh initial enrollment of the same phone.
    ///
    /// The counter is kept; the linkage is cleared along with the new roster row.
    pub fn refresh_for_enrollment(&mut self, student: &NewStudent) {
        self.name.clone_from(&student.name);
        self.email = student.email.clone();
        self.date = student.date;
        self.class.clone_from(&student.class);
        self.sub.clone_from(&student.sub);
        self.mentor = None;
    }

    /// Apply a re-enrollment if the window allows it.
    ///
    /// `mentor` is the student's current roster linkage, copied over so both
    /// datasets agree.
    ///
    /// # Errors
    ///
    /// Returns `GuidanceError::TooSoon` if fewer than
    /// [`REENROLLMENT_MIN_DAYS`] days have passed since the recorded date
    /// (including requests dated before it). Nothing is changed on error.
    pub fn reenroll(&mut self, request: &ReEnrollment, mentor: Option<String>) -> Result<()> {
        let elapsed_days = days_between(self.date, request.date);
        if elapsed_days < REENROLLMENT_MIN_DAYS {
            return Err(GuidanceError::TooSoon {
                elapsed_days,
                min_days: REENROLLMENT_MIN_DAYS,
            });
        }

        self.name.clone_from(&request.name);
        self.phone = request.phone.clone();
        self.email = request.email.clone();
        self.date = request.date;
        self.class.clone_from(&request.class);
        self.sub.clone_from(&request.sub);
        self.mentor = mentor;
        self.renrollment += 1;
        Ok(())
    }
}

impl NewHistory {
    /// First history row for a phone that was never enrolled.
    #[must_use]
    pub fn first_enrollment(request: &ReEnrollment, mentor: Option<String>) -> Self {
        Self {
            name: request.name.clone(),
            phone: request.phone.clone(),
            email: request.email.clone(),
            date: request.date,
            class: request.class.clone(),
            sub: request.sub.clone(),
            mentor,
            renrollment: 0,
        }
    }

    /// Materialise the row once the store has assigned an ID.
    #[must_use]
    pub fn into_record(self, id: i64) -> HistoryRecord {
        HistoryRecord {
            id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            date: self.date,
            class: self.class,
            sub: self.sub,
            mentor: self.mentor,
            renrollment: self.renrollment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record() -> HistoryRecord {
        HistoryRecord {
            id: 1,
            name: "Asha".into(),
            phone: Phone::parse("9876543210").unwrap(),
            email: Email::parse("asha@example.com").unwrap(),
            date: ymd(2024, 1, 1),
            class: "10".into(),
            sub: "Normal".into(),
            mentor: None,
            renrollment: 0,
        }
    }

    fn request(date: NaiveDate) -> ReEnrollment {
        ReEnrollment {
            name: "Asha K".into(),
            phone: Phone::parse("9876543210").unwrap(),
            email: Email::parse("asha.k@example.com").unwrap(),
            date,
            class: "11".into(),
            sub: "Premium".into(),
        }
    }

    #[test]
    fn rejects_inside_window_without_mutation() {
        let mut rec = record();
        let before = rec.clone();

        let err = rec.reenroll(&request(ymd(2024, 1, 20)), None).unwrap_err();
        assert_eq!(
            err,
            GuidanceError::TooSoon {
                elapsed_days: 19,
                min_days: 30
            }
        );
        assert_eq!(rec, before);
    }

    #[test]
    fn accepts_after_window_and_bumps_counter() {
        let mut rec = record();
        rec.reenroll(&request(ymd(2024, 2, 5)), Some("Meera".into()))
            .unwrap();

        assert_eq!(rec.renrollment, 1);
        assert_eq!(rec.date, ymd(2024, 2, 5));
        assert_eq!(rec.class, "11");
        assert_eq!(rec.sub, "Premium");
        assert_eq!(rec.mentor.as_deref(), Some("Meera"));
    }

    #[test]
    fn exactly_thirty_days_is_enough() {
        let mut rec = record();
        rec.reenroll(&request(ymd(2024, 1, 31)), None).unwrap();
        assert_eq!(rec.renrollment, 1);
    }

    #[test]
    fn earlier_date_is_too_soon() {
        let mut rec = record();
        assert!(matches!(
            rec.reenroll(&request(ymd(2023, 6, 1)), None),
            Err(GuidanceError::TooSoon { .. })
        ));
    }

    #[test]
    fn first_enrollment_starts_at_zero() {
        let new = NewHistory::first_enrollment(&request(ymd(2024, 1, 1)), None);
        assert_eq!(new.renrollment, 0);
        assert_eq!(new.name, "Asha K");
    }
}
