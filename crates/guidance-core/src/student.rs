//! Roster types: the live table of enrolled students.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{Email, Phone};

/// Subscription tiers sold through the payment page.
pub const SUBSCRIPTION_TIERS: [&str; 2] = ["Normal", "Premium"];

/// A student on the live roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Surrogate row ID; the identifier batch operations refer to.
    pub id: i64,

    /// Student name.
    pub name: String,

    /// Phone number. Unique across the roster.
    pub phone: Phone,

    /// Contact email.
    pub email: Email,

    /// Enrollment date.
    pub date: NaiveDate,

    /// School class or grade.
    pub class: String,

    /// Subscription tier.
    pub sub: String,

    /// Name of the assigned mentor; `None` while unassigned.
    #[serde(rename = "mentorName", with = "linkage", default)]
    pub mentor: Option<String>,
}

impl Student {
    /// Build the unassigned roster record for a new enrollment.
    #[must_use]
    pub fn enrolled(id: i64, new: &NewStudent) -> Self {
        Self {
            id,
            name: new.name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            date: new.date,
            class: new.class.clone(),
            sub: new.sub.clone(),
            mentor: None,
        }
    }

    /// Apply the profile part of a transfer; the linkage is left to the caller.
    pub fn apply_profile(&mut self, transfer: &StudentTransfer) {
        self.name.clone_from(&transfer.name);
        self.phone = transfer.phone.clone();
        self.email = transfer.email.clone();
        self.class.clone_from(&transfer.class);
        self.date = transfer.date;
    }

    /// Whether the student is linked to a mentor.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.mentor.is_some()
    }
}

/// Input for enrolling a new student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
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
}

/// Profile change plus mentor move for an existing student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentTransfer {
    /// New name.
    pub name: String,
    /// New phone number.
    pub phone: Phone,
    /// New email.
    pub email: Email,
    /// New school class.
    pub class: String,
    /// New enrollment date.
    pub date: NaiveDate,
    /// Mentor the student moves to.
    pub new_mentor: String,
}

/// A roster and history linkage written by a batch assignment.
///
/// Carries what is needed to reverse the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorLink {
    /// Roster ID of the linked student.
    pub student_id: i64,
    /// The student's phone when the link was made.
    pub phone: Phone,
    /// Mentor the student was linked to.
    pub mentor: String,
    /// History linkage before the write.
    pub previous_history: Option<String>,
}

/// Serde adapter for mentor linkage: `None` travels as `""`, and both `""`
/// and `null` read back as `None`.
pub mod linkage {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional mentor name as a plain string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    /// Deserialize a mentor name, mapping blank values to `None`.
    ///
    /// # Errors
    ///
    /// Fails if the value is neither a string nor null.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(crate::text::optional(raw.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student(mentor: Option<&str>) -> Student {
        Student {
            id: 7,
            name: "Asha".into(),
            phone: Phone::parse("9876543210").unwrap(),
            email: Email::parse("asha@example.com").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            class: "10".into(),
            sub: "Premium".into(),
            mentor: mentor.map(str::to_string),
        }
    }

    #[test]
    fn unassigned_serializes_as_empty_string() {
        let value = serde_json::to_value(student(None)).unwrap();
        assert_eq!(value["mentorName"], "");
        assert_eq!(value["date"], "2024-01-15");
        assert_eq!(value["phone"], "9876543210");
    }

    #[test]
    fn linkage_reads_blank_and_null_as_unassigned() {
        let mut value = serde_json::to_value(student(Some("Meera"))).unwrap();
        let back: Student = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.mentor.as_deref(), Some("Meera"));
        assert!(back.is_assigned());

        value["mentorName"] = json!("  ");
        let back: Student = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.mentor, None);

        value["mentorName"] = json!(null);
        let back: Student = serde_json::from_value(value).unwrap();
        assert!(!back.is_assigned());
    }
}
