//! Capacity-checked batch assignment.
//!
//! The mentor's capacity is reserved first, in one atomic store call. The
//! students are then linked concurrently, each with one atomic store call
//! that refuses students who already have a mentor. If any student fails or
//! the deadline passes, every link made by this batch is reversed and the
//! reservation released, so the batch either lands completely or not at all.

use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use guidance_core::{text, Mentor, MentorLink, Phone};
use guidance_store::Store;

use super::{dedupe_ids, FanOut};
use crate::error::ApiError;

/// A completed batch assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The mentor after the reservation.
    pub mentor: Mentor,
    /// Phones of the linked students, in request order.
    pub assigned: Vec<Phone>,
}

/// Link every student in `ids` to `mentor_name`.
///
/// Repeated IDs count once. Students not yet started when the deadline
/// passes fail the batch; a link already in flight always finishes, so the
/// set of links to reverse is exact.
///
/// # Errors
///
/// - `ApiError::Validation` for a blank mentor name or an empty ID list.
/// - `ApiError::NotFound` for an unknown mentor, student or history row.
/// - `ApiError::CapacityExceeded` if the mentor lacks headroom; nothing is
///   written.
/// - `ApiError::Conflict` if a student already has a mentor.
/// - `ApiError::Internal` if the fan-out misses its deadline.
///
/// Every error after the reservation is returned once compensation has run.
pub async fn assign_students(
    store: &dyn Store,
    mentor_name: &str,
    ids: &[i64],
    limits: FanOut,
) -> Result<Assignment, ApiError> {
    let mentor_name = text::required("mentorName", mentor_name)?;
    let ids = dedupe_ids(ids);
    if ids.is_empty() {
        return Err(ApiError::Validation("ids must not be empty".into()));
    }
    let requested = i32::try_from(ids.len())
        .map_err(|_| ApiError::Validation("too many students in one request".into()))?;

    let mentor = store
        .reserve_capacity(&mentor_name, requested)
        .await
        .map_err(|e| {
            tracing::warn!(mentor = %mentor_name, requested, error = %e, "Assignment rejected");
            ApiError::from(e)
        })?;

    tracing::info!(
        mentor = %mentor_name,
        requested,
        load = mentor.onn,
        capacity = mentor.handle,
        "Capacity reserved"
    );

    let deadline = Instant::now() + limits.deadline;
    let mut results = stream::iter(ids.iter().copied().enumerate())
        .map(|(index, id)| {
            let mentor_name = mentor_name.as_str();
            async move { (index, link_one(store, mentor_name, id, deadline).await) }
        })
        .buffer_unordered(limits.concurrency)
        .collect::<Vec<_>>()
        .await;
    results.sort_by_key(|(index, _)| *index);

    let mut links = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (_, result) in results {
        match result {
            Ok(link) => links.push(link),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        None => {
            tracing::info!(mentor = %mentor_name, assigned = links.len(), "Students assigned");
            Ok(Assignment {
                mentor,
                assigned: links.into_iter().map(|link| link.phone).collect(),
            })
        }
        Some(err) => {
            tracing::warn!(mentor = %mentor_name, error = %err, "Assignment failed, compensating");
            compensate(store, &mentor_name, requested, &links).await;
            Err(err)
        }
    }
}

async fn link_one(
    store: &dyn Store,
    mentor_name: &str,
    id: i64,
    deadline: Instant,
) -> Result<MentorLink, ApiError> {
    if Instant::now() >= deadline {
        return Err(ApiError::Internal(format!(
            "assignment to {mentor_name} passed its deadline before student {id}"
        )));
    }

    let link = store.link_student(id, mentor_name).await?;
    tracing::debug!(student_id = id, phone = %link.phone, mentor = %mentor_name, "Student linked");
    Ok(link)
}

/// Reverse this batch's links (newest first) and release the reservation.
///
/// A student moved or deleted since linking had its slot freed by that
/// operation, so only the remaining slots are released.
async fn compensate(store: &dyn Store, mentor_name: &str, requested: i32, links: &[MentorLink]) {
    let mut release = requested;

    for link in links.iter().rev() {
        match store.unlink_student(link).await {
            Ok(true) => {
                tracing::debug!(student_id = link.student_id, mentor = %mentor_name, "Link reversed");
            }
            Ok(false) => {
                tracing::info!(
                    student_id = link.student_id,
                    mentor = %mentor_name,
                    "Student moved since linking, slot already freed"
                );
                release -= 1;
            }
            Err(e) => {
                tracing::error!(
                    student_id = link.student_id,
                    mentor = %mentor_name,
                    error = %e,
                    "Failed to reverse link, keeping its slot"
                );
                release -= 1;
            }
        }
    }

    if release == 0 {
        return;
    }

    match store.release_capacity(mentor_name, release).await {
        Ok(mentor) => tracing::info!(
            mentor = %mentor_name,
            released = release,
            load = mentor.onn,
            "Reservation released"
        ),
        Err(e) => tracing::error!(
            mentor = %mentor_name,
            released = release,
            error = %e,
            "Failed to release reservation"
        ),
    }
}
