//! Error types for guidance business rules.

/// Result type for guidance rule evaluation.
pub type Result<T> = std::result::Result<T, GuidanceError>;

/// Errors raised by the domain rules before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuidanceError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Assigning more students would exceed the mentor's capacity.
    #[error(
        "mentor {mentor} can't take {requested} more student(s): load={load}, capacity={capacity}"
    )]
    CapacityExceeded {
        /// The mentor name.
        mentor: String,
        /// Current load (`onn`).
        load: i32,
        /// Maximum capacity (`handle`).
        capacity: i32,
        /// Number of students requested.
        requested: i32,
    },

    /// A capacity change would drop below the mentor's current load.
    #[error("capacity {capacity} is below the current load of {load}")]
    CapacityBelowLoad {
        /// Requested capacity.
        capacity: i32,
        /// Current load (`onn`).
        load: i32,
    },

    /// A re-enrollment arrived inside the minimum window.
    #[error(
        "a re-enrollment for this phone number has already been done within the last {min_days} days ({elapsed_days} days ago)"
    )]
    TooSoon {
        /// Whole days between the recorded and the requested date.
        elapsed_days: i64,
        /// Minimum gap in days.
        min_days: i64,
    },

    /// Invalid natural key.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] crate::ids::KeyError),
}
