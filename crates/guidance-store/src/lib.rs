//! Storage layer for guidance.
//!
//! This crate is the persistence collaborator: it owns the roster, mentor,
//! re-enrollment history, mentor login and owner record sets, and exposes
//! them through the [`Store`] trait.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`. Compound operations run in a single
//!   transaction and take `SELECT ... FOR UPDATE` row locks, so a
//!   read-check-write on one mentor is never interleaved with another.
//! - [`MemoryStore`]: process-local tables behind one async mutex. Used by the
//!   test suites and for local runs without a database.
//!
//! # Example
//!
//! ```no_run
//! use guidance_store::{MemoryStore, Store};
//!
//! # async fn demo() -> guidance_store::Result<()> {
//! let store = MemoryStore::new();
//! let mentors = store.list_mentors().await?;
//! assert!(mentors.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use guidance_core::{
    DeletionWindow, Email, HistoryRecord, Mentor, MentorCredential, MentorLink,
    MentorProfileUpdate, NewMentor, NewOwner, NewStudent, Owner, Phone, ReEnrollment, Student, StudentTransfer,
};

/// The storage trait defining all persistence operations.
///
/// Single-record methods are plain CRUD. Compound methods apply a business
/// rule from `guidance-core` and every write it implies atomically; a rule
/// rejection surfaces as `StoreError::Rule` with nothing written.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short name of the backend, e.g. `"postgres"`.
    fn backend(&self) -> &'static str;

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    async fn ping(&self) -> Result<()>;

    // =========================================================================
    // Roster
    // =========================================================================

    /// List every roster record, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_students(&self) -> Result<Vec<Student>>;

    /// List roster records without a mentor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_unassigned_students(&self) -> Result<Vec<Student>> {
        let students = self.list_students().await?;
        Ok(students.into_iter().filter(|s| !s.is_assigned()).collect())
    }

    /// Get a roster record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_student(&self, id: i64) -> Result<Option<Student>>;

    /// Get a roster record by phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_student_by_phone(&self, phone: &Phone) -> Result<Option<Student>>;

    /// Overwrite a roster record.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if no record has this ID.
    /// - `StoreError::Duplicate` if the phone belongs to another record.
    async fn update_student(&self, student: &Student) -> Result<()>;

    /// Enroll a student: create the roster record and its history row together.
    ///
    /// The student starts unassigned. If a history row already exists for the
    /// phone it is refreshed in place and keeps its counter.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if the phone is already on the roster.
    async fn enroll(&self, student: &NewStudent) -> Result<Student>;

    /// Update a student's profile and move them to another mentor.
    ///
    /// The old mentor frees a slot, the new one must have headroom and gains
    /// one; the history row follows the linkage and phone.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown student or new mentor.
    /// - `StoreError::Duplicate` if the new phone belongs to another student.
    /// - `StoreError::Rule` with `CapacityExceeded` if the new mentor is full.
    async fn transfer_student(&self, phone: &Phone, transfer: &StudentTransfer)
        -> Result<Student>;

    /// Link an unassigned student, and their history row, to `mentor`.
    ///
    /// The check and both writes happen atomically, so two requests can never
    /// both claim the same student. Mentor counters are not touched.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown student or a missing history row.
    /// - `StoreError::AlreadyLinked` if the student already has a mentor.
    async fn link_student(&self, id: i64, mentor: &str) -> Result<MentorLink>;

    /// Reverse a [`Store::link_student`] write.
    ///
    /// Only applies while the student is still linked to `link.mentor`; the
    /// history row is restored only while it still names that mentor too.
    /// Returns `false` with nothing written if the student has since been
    /// moved or deleted, in which case that operation already freed the slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn unlink_student(&self, link: &MentorLink) -> Result<bool>;

    /// Delete a roster record if its enrollment date lies inside `window`.
    ///
    /// The mentor the student was linked to frees one slot in the same
    /// transaction. Returns the deleted record, or `None` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_recent_student(
        &self,
        id: i64,
        window: DeletionWindow,
    ) -> Result<Option<Student>>;

    // =========================================================================
    // History
    // =========================================================================

    /// List every history row, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_history(&self) -> Result<Vec<HistoryRecord>>;

    /// Get the history row for a phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_history_by_phone(&self, phone: &Phone) -> Result<Option<HistoryRecord>>;

    /// Overwrite a history row.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no row has this ID.
    async fn update_history(&self, record: &HistoryRecord) -> Result<()>;

    /// Re-enroll a student through the 30-day gate.
    ///
    /// Creates the row with counter 0 if the phone has no history; otherwise
    /// checks the window, refreshes the profile, copies the roster linkage and
    /// increments the counter.
    ///
    /// # Errors
    ///
    /// `StoreError::Rule` with `TooSoon` inside the window.
    async fn reenroll(&self, request: &ReEnrollment) -> Result<HistoryRecord>;

    // =========================================================================
    // Mentors
    // =========================================================================

    /// List every mentor, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_mentors(&self) -> Result<Vec<Mentor>>;

    /// List mentors with no active students.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_idle_mentors(&self) -> Result<Vec<Mentor>> {
        let mentors = self.list_mentors().await?;
        Ok(mentors.into_iter().filter(Mentor::is_idle).collect())
    }

    /// Get a mentor by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_mentor_by_name(&self, name: &str) -> Result<Option<Mentor>>;

    /// Get a mentor by phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_mentor_by_phone(&self, phone: &Phone) -> Result<Option<Mentor>>;

    /// Register a mentor with zero capacity, plus their login.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if the name, phone or login email is taken.
    async fn register_mentor(&self, mentor: &NewMentor, password_hash: &str) -> Result<Mentor>;

    /// Atomically check headroom and reserve `count` slots on a mentor.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown mentor.
    /// - `StoreError::Rule` with `CapacityExceeded`; nothing is written.
    async fn reserve_capacity(&self, name: &str, count: i32) -> Result<Mentor>;

    /// Undo a reservation made by [`Store::reserve_capacity`].
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` for an unknown mentor.
    async fn release_capacity(&self, name: &str, count: i32) -> Result<Mentor>;

    /// Set a mentor's capacity.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown mentor.
    /// - `StoreError::Rule` with `CapacityBelowLoad` if below the current load.
    async fn set_capacity(&self, name: &str, handle: i32) -> Result<Mentor>;

    /// Update a mentor's profile and login, found by the mentor's phone.
    ///
    /// A rename is carried to every roster and history linkage.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown mentor or missing login.
    /// - `StoreError::Duplicate` if the new name, phone or email is taken.
    async fn update_mentor_profile(
        &self,
        phone: &Phone,
        update: &MentorProfileUpdate,
    ) -> Result<Mentor>;

    /// Delete a mentor and their login, only while they have no students.
    ///
    /// Returns `false` if the mentor does not exist or is not idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_idle_mentor(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Get a mentor login by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_credential_by_email(&self, email: &Email) -> Result<Option<MentorCredential>>;

    /// Replace a mentor login's password hash.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no login has this email.
    async fn update_password(&self, email: &Email, password_hash: &str) -> Result<()>;

    // =========================================================================
    // Owners
    // =========================================================================

    /// List every owner account, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_owners(&self) -> Result<Vec<Owner>>;

    /// Create an owner account.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` if the email is taken.
    async fn create_owner(&self, owner: &NewOwner, password_hash: &str) -> Result<Owner>;
}
