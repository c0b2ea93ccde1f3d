//! Roster handlers: enrollment, listing, reassignment and the deletion sweep.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use guidance_core::{parse_date, text, Email, NewStudent, Phone, Student, StudentTransfer};

use super::{message, ApiJson, MessageResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::workflows::sweep_recent_students;

/// Enrollment request.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    /// Student name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// Enrollment date.
    pub date: String,
    /// School class or grade.
    pub class: String,
    /// Subscription tier.
    pub sub: String,
    /// Must be empty: students are linked through `/api/finalMentor`.
    #[serde(default, rename = "mentorName")]
    pub mentor_name: Option<String>,
}

impl EnrollRequest {
    fn into_new_student(self) -> Result<NewStudent, ApiError> {
        if text::optional(self.mentor_name.as_deref()).is_some() {
            return Err(ApiError::Validation(
                "mentorName must be empty on enrollment; assign through /api/finalMentor".into(),
            ));
        }

        Ok(NewStudent {
            name: text::required("name", &self.name)?,
            phone: Phone::parse(&self.phone)?,
            email: Email::parse(&self.email)?,
            date: parse_date(&self.date)?,
            class: text::required("class", &self.class)?,
            sub: text::required("sub", &self.sub)?,
        })
    }
}

/// Reassignment request for `POST /student/:phone`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Student name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Phone number; may differ from the one in the path.
    pub phone: String,
    /// School class or grade.
    pub class: String,
    /// Enrollment date.
    pub date: String,
    /// Mentor to move the student to.
    #[serde(rename = "newMentor")]
    pub new_mentor: String,
}

impl TryFrom<TransferRequest> for StudentTransfer {
    type Error = ApiError;

    fn try_from(body: TransferRequest) -> Result<Self, ApiError> {
        Ok(Self {
            name: text::required("name", &body.name)?,
            phone: Phone::parse(&body.phone)?,
            email: Email::parse(&body.email)?,
            class: text::required("class", &body.class)?,
            date: parse_date(&body.date)?,
            new_mentor: text::required("newMentor", &body.new_mentor)?,
        })
    }
}

/// Deletion sweep request.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Roster IDs to consider.
    pub ids: Vec<i64>,
    /// Accepted for older clients and ignored; the store frees the slot of
    /// the mentor each deleted student was actually linked to.
    #[serde(default)]
    pub mentors: Vec<String>,
}

/// Deletion sweep response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Number of students deleted.
    pub deleted: usize,
    /// Number of IDs left alone.
    pub skipped: usize,
}

/// List every roster record.
pub async fn list_students(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.store.list_students().await?))
}

/// List roster records without a mentor.
pub async fn list_unassigned(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.store.list_unassigned_students().await?))
}

/// Enroll a student.
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<EnrollRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let student = body.into_new_student()?;
    let record = state.store.enroll(&student).await?;

    tracing::info!(student_id = record.id, phone = %record.phone, "Student enrolled");

    Ok(message("User data saved successfully"))
}

/// Update a student's profile and move them to `newMentor`.
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
    ApiJson(body): ApiJson<TransferRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let phone = Phone::parse(&phone)?;
    let transfer = StudentTransfer::try_from(body)?;

    let student = state
        .store
        .transfer_student(&phone, &transfer)
        .await
        .map_err(|e| {
            tracing::warn!(phone = %phone, mentor = %transfer.new_mentor, error = %e, "Reassignment rejected");
            ApiError::from(e)
        })?;

    tracing::info!(
        student_id = student.id,
        mentor = %transfer.new_mentor,
        "Student reassigned"
    );

    Ok(message("Mentor and students updated successfully"))
}

/// Delete recently enrolled students.
pub async fn delete_recent(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !body.mentors.is_empty() {
        tracing::debug!(
            mentors = body.mentors.len(),
            "Ignoring legacy mentors field on deletion sweep"
        );
    }

    let today = chrono::Local::now().date_naive();
    let outcome =
        sweep_recent_students(state.store.as_ref(), &body.ids, today, state.fan_out()).await?;

    Ok(Json(DeleteResponse {
        message: "Data deleted successfully".into(),
        deleted: outcome.deleted.len(),
        skipped: outcome.skipped.len(),
    }))
}
