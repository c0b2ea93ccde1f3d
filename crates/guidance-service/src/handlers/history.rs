//! Re-enrollment history handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use guidance_core::{parse_date, text, Email, HistoryRecord, Phone, ReEnrollment};

use super::{message, ApiJson, MessageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Re-enrollment request.
#[derive(Debug, Deserialize)]
pub struct ReEnrollRequest {
    /// Student name.
    pub name: String,
    /// Phone number; the history key.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// New enrollment date.
    pub date: String,
    /// School class or grade.
    pub class: String,
    /// Subscription tier.
    pub sub: String,
}

impl TryFrom<ReEnrollRequest> for ReEnrollment {
    type Error = ApiError;

    fn try_from(body: ReEnrollRequest) -> Result<Self, ApiError> {
        Ok(Self {
            name: text::required("name", &body.name)?,
            phone: Phone::parse(&body.phone)?,
            email: Email::parse(&body.email)?,
            date: parse_date(&body.date)?,
            class: text::required("class", &body.class)?,
            sub: text::required("sub", &body.sub)?,
        })
    }
}

/// List every history row.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    Ok(Json(state.store.list_history().await?))
}

/// Re-enroll a student, at most once per 30 days.
pub async fn reenroll(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ReEnrollRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = ReEnrollment::try_from(body)?;

    let record = state.store.reenroll(&request).await.map_err(|e| {
        tracing::warn!(phone = %request.phone, date = %request.date, error = %e, "Re-enrollment rejected");
        ApiError::from(e)
    })?;

    tracing::info!(
        phone = %record.phone,
        renrollment = record.renrollment,
        "Re-enrollment recorded"
    );

    Ok(message("Re-enrollment data saved successfully"))
}
