//! Mentor types for guidance.
//!
//! A mentor carries up to `handle` students at once. `onn` is the current
//! load and `total` the number of students ever assigned. After every
//! successful operation `0 <= onn <= handle` and `total >= onn`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{GuidanceError, Result};
use crate::ids::{Email, Phone};

/// A registered mentor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    /// Surrogate row ID.
    pub id: i64,

    /// Display name. Unique; this is the identity students link to.
    pub name: String,

    /// College or institution.
    pub college: String,

    /// Registration date.
    pub date: NaiveDate,

    /// Contact phone. Unique.
    pub phone: Phone,

    /// Maximum number of students carried at once.
    pub handle: i32,

    /// Students currently assigned.
    pub onn: i32,

    /// Students ever assigned.
    pub total: i32,
}

impl Mentor {
    /// Build a freshly registered mentor with zero capacity and load.
    #[must_use]
    pub fn registered(id: i64, new: &NewMentor) -> Self {
        Self {
            id,
            name: new.name.clone(),
            college: new.college.clone(),
            date: new.date,
            phone: new.phone.clone(),
            handle: 0,
            onn: 0,
            total: 0,
        }
    }

    /// Remaining capacity.
    #[must_use]
    pub const fn headroom(&self) -> i32 {
        self.handle - self.onn
    }

    /// Whether the mentor has no active students and may be deleted.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.onn == 0
    }

    /// Check that `requested` more students fit.
    ///
    /// # Errors
    ///
    /// - `GuidanceError::Validation` if `requested` is not positive.
    /// - `GuidanceError::CapacityExceeded` if `onn + requested > handle`.
    pub fn check_headroom(&self, requested: i32) -> Result<()> {
        if requested <= 0 {
            return Err(GuidanceError::Validation(
                "at least one student must be requested".into(),
            ));
        }

        if self.onn.saturating_add(requested) > self.handle {
            return Err(GuidanceError::CapacityExceeded {
                mentor: self.name.clone(),
                load: self.onn,
                capacity: self.handle,
                requested,
            });
        }

        Ok(())
    }

    /// Reserve `requested` slots: `onn += requested`, `total += requested`.
    ///
    /// # Errors
    ///
    /// Same as [`Mentor::check_headroom`]; nothing is changed on error.
    pub fn reserve(&mut self, requested: i32) -> Result<()> {
        self.check_headroom(requested)?;
        self.onn += requested;
        self.total += requested;
        Ok(())
    }

    /// Undo a reservation of `count` slots.
    pub fn release(&mut self, count: i32) {
        self.onn = (self.onn - count).max(0);
        self.total = (self.total - count).max(self.onn);
    }

    /// A student left: free one slot. `total` is lifetime and stays.
    pub fn vacate(&mut self) {
        self.onn = (self.onn - 1).max(0);
    }

    /// Set the maximum capacity.
    ///
    /// # Errors
    ///
    /// - `GuidanceError::Validation` for negative capacities.
    /// - `GuidanceError::CapacityBelowLoad` if `handle < onn`.
    pub fn set_capacity(&mut self, handle: i32) -> Result<()> {
        if handle < 0 {
            return Err(GuidanceError::Validation(
                "studentCount must not be negative".into(),
            ));
        }

        if handle < self.onn {
            return Err(GuidanceError::CapacityBelowLoad {
                capacity: handle,
                load: self.onn,
            });
        }

        self.handle = handle;
        Ok(())
    }
}

/// Input for registering a mentor together with their login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMentor {
    /// Display name.
    pub name: String,
    /// College or institution.
    pub college: String,
    /// Registration date.
    pub date: NaiveDate,
    /// Contact phone.
    pub phone: Phone,
    /// Login email.
    pub email: Email,
}

/// Profile change for an existing mentor and their login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorProfileUpdate {
    /// New display name; propagated to every student linked to the old one.
    pub name: String,
    /// New contact phone.
    pub phone: Phone,
    /// New login email.
    pub email: Email,
}

/// Mentor login credential.
///
/// Shares the mentor's name but has its own lifecycle: only a password
/// change or a profile update touches it after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentorCredential {
    /// Surrogate row ID.
    pub id: i64,
    /// Login email. Unique.
    pub email: Email,
    /// Password hash. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    /// Name of the mentor this login belongs to.
    #[serde(rename = "name")]
    pub mentor_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentor(handle: i32, onn: i32) -> Mentor {
        Mentor {
            id: 1,
            name: "Meera".into(),
            college: "IIT".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            phone: Phone::parse("9000000001").unwrap(),
            handle,
            onn,
            total: onn,
        }
    }

    #[test]
    fn reserve_up_to_capacity() {
        let mut m = mentor(5, 3);
        m.reserve(2).unwrap();
        assert_eq!(m.onn, 5);
        assert_eq!(m.total, 5);
        assert_eq!(m.headroom(), 0);
    }

    #[test]
    fn reserve_past_capacity_changes_nothing() {
        let mut m = mentor(5, 5);
        let err = m.reserve(1).unwrap_err();
        assert_eq!(
            err,
            GuidanceError::CapacityExceeded {
                mentor: "Meera".into(),
                load: 5,
                capacity: 5,
                requested: 1,
            }
        );
        assert_eq!(m.onn, 5);
        assert_eq!(m.total, 5);
    }

    #[test]
    fn reserve_requires_positive_count() {
        let mut m = mentor(5, 0);
        assert!(matches!(m.reserve(0), Err(GuidanceError::Validation(_))));
        assert!(matches!(m.reserve(-2), Err(GuidanceError::Validation(_))));
    }

    #[test]
    fn release_undoes_reservation() {
        let mut m = mentor(10, 2);
        m.total = 7;
        m.reserve(3).unwrap();
        m.release(3);
        assert_eq!(m.onn, 2);
        assert_eq!(m.total, 7);
    }

    #[test]
    fn vacate_keeps_lifetime_total() {
        let mut m = mentor(3, 1);
        m.vacate();
        assert_eq!(m.onn, 0);
        assert_eq!(m.total, 1);

        m.vacate();
        assert_eq!(m.onn, 0);
        assert!(m.is_idle());
    }

    #[test]
    fn capacity_cannot_drop_below_load() {
        let mut m = mentor(5, 4);
        assert_eq!(
            m.set_capacity(3),
            Err(GuidanceError::CapacityBelowLoad {
                capacity: 3,
                load: 4
            })
        );
        assert_eq!(m.handle, 5);

        m.set_capacity(4).unwrap();
        assert_eq!(m.handle, 4);
        assert!(m.set_capacity(-1).is_err());
    }
}
