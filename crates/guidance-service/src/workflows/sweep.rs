//! Deletion sweep over recently enrolled students.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use guidance_core::DeletionWindow;
use guidance_store::Store;

use super::{dedupe_ids, FanOut};
use crate::error::ApiError;

/// Result of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// IDs that were deleted.
    pub deleted: Vec<i64>,
    /// IDs left alone: unknown, or enrolled outside the window.
    pub skipped: Vec<i64>,
}

/// Delete each student in `ids` enrolled inside the window ending `today`.
///
/// Every deletion frees one slot on the mentor that student was linked to,
/// in the same store transaction.
///
/// # Errors
///
/// The first store error, once every item has finished, or
/// `ApiError::Internal` if the deadline passes.
pub async fn sweep_recent_students(
    store: &dyn Store,
    ids: &[i64],
    today: NaiveDate,
    limits: FanOut,
) -> Result<SweepOutcome, ApiError> {
    let window = DeletionWindow::ending(today);
    let ids = dedupe_ids(ids);

    let fan_out = stream::iter(ids)
        .map(|id| async move { (id, store.delete_recent_student(id, window).await) })
        .buffer_unordered(limits.concurrency)
        .collect::<Vec<_>>();

    let mut results = tokio::time::timeout(limits.deadline, fan_out)
        .await
        .map_err(|_| {
            ApiError::Internal(format!(
                "deletion sweep did not finish within {}s",
                limits.deadline.as_secs_f64()
            ))
        })?;
    results.sort_by_key(|(id, _)| *id);

    let mut outcome = SweepOutcome::default();
    let mut first_error = None;
    for (id, result) in results {
        match result {
            Ok(Some(student)) => {
                tracing::info!(
                    student_id = id,
                    mentor = student.mentor.as_deref().unwrap_or(""),
                    "Student deleted"
                );
                outcome.deleted.push(id);
            }
            Ok(None) => {
                tracing::debug!(student_id = id, "Student outside deletion window");
                outcome.skipped.push(id);
            }
            Err(e) => {
                tracing::warn!(student_id = id, error = %e, "Deletion failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(outcome),
    }
}
