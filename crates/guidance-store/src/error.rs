//! Error types for guidance storage.

use guidance_core::GuidanceError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded into a domain record.
    #[error("decode error: {0}")]
    Decode(String),

    /// Record not found.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// A unique natural key is already taken.
    #[error("{entity} with {field} {value} already exists")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// Name of the unique field.
        field: &'static str,
        /// The conflicting value.
        value: String,
    },

    /// The student is already linked to a mentor.
    #[error("student {student} is already assigned to {mentor}")]
    AlreadyLinked {
        /// Roster ID of the student.
        student: i64,
        /// Mentor the student is linked to.
        mentor: String,
    },

    /// A business rule rejected the change; nothing was written.
    #[error(transparent)]
    Rule(#[from] GuidanceError),
}

impl StoreError {
    /// Shorthand for `StoreError::NotFound`.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for `StoreError::Duplicate`.
    pub fn duplicate(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::Duplicate {
            entity,
            field,
            value: value.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
