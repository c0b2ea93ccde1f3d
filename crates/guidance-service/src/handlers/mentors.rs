//! Mentor handlers: registration, capacity, profile, credentials and the
//! capacity-checked batch assignment.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use guidance_core::{parse_date, text, Email, Mentor, MentorProfileUpdate, NewMentor, Phone};

use super::{message, ApiJson, MessageResponse};
use crate::error::ApiError;
use crate::state::AppState;
use crate::workflows::assign_students;

/// Mentor registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterMentorRequest {
    /// Unique display name.
    pub name: String,
    /// College or affiliation.
    pub college: String,
    /// Registration date.
    pub date: String,
    /// Phone number.
    pub phone: String,
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
}

/// Capacity change request.
#[derive(Debug, Deserialize)]
pub struct CapacityRequest {
    /// Mentor name.
    #[serde(rename = "mentorName")]
    pub mentor_name: String,
    /// New capacity.
    #[serde(rename = "studentCount")]
    pub student_count: i32,
}

/// Profile update request for `POST /mentorupdate/:phone`.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    /// New display name.
    pub name: String,
    /// New phone number.
    #[serde(rename = "phoneNo")]
    pub phone_no: String,
    /// New login email.
    pub email: String,
}

/// Password change request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Login email.
    pub email: String,
    /// Current password.
    pub old_password: String,
    /// Replacement password.
    pub new_password: String,
}

/// Batch assignment request.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// Mentor to link the students to.
    #[serde(rename = "mentorName")]
    pub mentor_name: String,
    /// Roster IDs.
    pub ids: Vec<i64>,
}

/// Batch assignment response.
#[derive(Debug, Serialize)]
pub struct AssignResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The mentor after the assignment.
    pub mentor: Mentor,
    /// Phones of the linked students.
    pub assigned: Vec<String>,
}

/// Mentor deletion request.
#[derive(Debug, Deserialize)]
pub struct DeleteMentorsRequest {
    /// Mentor IDs.
    pub ids: Vec<i64>,
}

/// Mentor deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteMentorsResponse {
    /// Human-readable outcome.
    pub message: String,
    /// IDs that were deleted.
    pub deleted: Vec<i64>,
    /// IDs that were missing or still have students.
    pub skipped: Vec<i64>,
}

/// List every mentor.
pub async fn list_mentors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Mentor>>, ApiError> {
    Ok(Json(state.store.list_mentors().await?))
}

/// List mentors with no active students.
pub async fn list_deletable(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Mentor>>, ApiError> {
    Ok(Json(state.store.list_idle_mentors().await?))
}

/// Register a mentor and their login.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterMentorRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mentor = NewMentor {
        name: text::required("name", &body.name)?,
        college: text::required("college", &body.college)?,
        date: parse_date(&body.date)?,
        phone: Phone::parse(&body.phone)?,
        email: Email::parse(&body.email)?,
    };
    let password_hash = state.passwords.hash(&body.password).await?;

    let record = state.store.register_mentor(&mentor, &password_hash).await?;

    tracing::info!(mentor_id = record.id, mentor = %record.name, "Mentor registered");

    Ok(message("Mentor data saved successfully"))
}

/// Set a mentor's capacity.
pub async fn set_capacity(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CapacityRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = text::required("mentorName", &body.mentor_name)?;

    let mentor = state
        .store
        .set_capacity(&name, body.student_count)
        .await
        .map_err(|e| {
            tracing::warn!(mentor = %name, capacity = body.student_count, error = %e, "Capacity change rejected");
            ApiError::from(e)
        })?;

    tracing::info!(mentor = %name, capacity = mentor.handle, load = mentor.onn, "Capacity updated");

    Ok(message("Mentor data Updated successfully"))
}

/// Update a mentor's profile and login.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let phone = Phone::parse(&phone)?;
    let update = MentorProfileUpdate {
        name: text::required("name", &body.name)?,
        phone: Phone::parse(&body.phone_no)?,
        email: Email::parse(&body.email)?,
    };

    let mentor = state.store.update_mentor_profile(&phone, &update).await?;

    tracing::info!(mentor_id = mentor.id, mentor = %mentor.name, "Mentor profile updated");

    Ok(message("Mentor data Updated successfully"))
}

/// Change a mentor's password after checking the old one.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = Email::parse(&body.email)?;

    let credential = state
        .store
        .get_credential_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User with this email not found".into()))?;

    if !state
        .passwords
        .verify(&body.old_password, &credential.password_hash)
        .await?
    {
        tracing::warn!(email = %email, "Password change with wrong old password");
        return Err(ApiError::InvalidCredentials);
    }

    let password_hash = state.passwords.hash(&body.new_password).await?;
    state.store.update_password(&email, &password_hash).await?;

    tracing::info!(email = %email, "Mentor password changed");

    Ok(message("Mentor Password updated successfully"))
}

/// Link a batch of students to a mentor, all or nothing.
pub async fn assign(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    let assignment = assign_students(
        state.store.as_ref(),
        &body.mentor_name,
        &body.ids,
        state.fan_out(),
    )
    .await?;

    Ok(Json(AssignResponse {
        message: "Mentor and students updated successfully".into(),
        mentor: assignment.mentor,
        assigned: assignment.assigned.into_iter().map(String::from).collect(),
    }))
}

/// Delete mentors that have no active students.
pub async fn delete_idle(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<DeleteMentorsRequest>,
) -> Result<Json<DeleteMentorsResponse>, ApiError> {
    let mut deleted = Vec::new();
    let mut skipped = Vec::new();

    for id in crate::workflows::dedupe_ids(&body.ids) {
        if state.store.delete_idle_mentor(id).await? {
            tracing::info!(mentor_id = id, "Mentor deleted");
            deleted.push(id);
        } else {
            tracing::debug!(mentor_id = id, "Mentor missing or still active");
            skipped.push(id);
        }
    }

    Ok(Json(DeleteMentorsResponse {
        message: "Mentor data deleted successfully".into(),
        deleted,
        skipped,
    }))
}
