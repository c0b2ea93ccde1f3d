//! Core types and rules for guidance.
//!
//! This crate provides the foundational types of the mentorship program:
//!
//! - **Keys**: `Phone`, `Email` (normalised natural keys)
//! - **Roster**: `Student`, `NewStudent`, `StudentTransfer`
//! - **History**: `HistoryRecord`, `ReEnrollment`, the 30-day re-enrollment gate
//! - **Mentors**: `Mentor` with capacity accounting, `MentorCredential`
//! - **Owners**: `Owner`
//! - **Dates**: calendar-date parsing and the deletion window
//!
//! # Capacity
//!
//! A mentor's `handle` is the most students they may carry at once, `onn` the
//! current load and `total` the lifetime count. Every rule here keeps
//! `0 <= onn <= handle` and `total >= onn`. Rules are pure; the store applies
//! them inside its transactions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod dates;
pub mod error;
pub mod history;
pub mod ids;
pub mod mentor;
pub mod owner;
pub mod student;
pub mod text;

pub use dates::{parse_date, DeletionWindow, DELETION_WINDOW_DAYS};
pub use error::{GuidanceError, Result};
pub use history::{HistoryRecord, NewHistory, ReEnrollment, REENROLLMENT_MIN_DAYS};
pub use ids::{Email, KeyError, Phone};
pub use mentor::{Mentor, MentorCredential, MentorProfileUpdate, NewMentor};
pub use owner::{NewOwner, Owner};
pub use student::{MentorLink, NewStudent, Student, StudentTransfer, SUBSCRIPTION_TIERS};
