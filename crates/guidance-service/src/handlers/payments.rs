//! Payment-provider glue.
//!
//! `/order` receives the provider's payment webhook and enrolls the student
//! named in the payment notes. Signatures are not verified here.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use guidance_core::{text, Email, NewStudent, Phone, SUBSCRIPTION_TIERS};

use super::{message, ApiJson, MessageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Payment webhook body. Only the fields used for enrollment are read.
#[derive(Debug, Deserialize)]
pub struct OrderEvent {
    /// Event payload.
    pub payload: OrderPayload,
}

/// Payment webhook payload.
#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    /// The captured payment.
    pub payment: PaymentWrapper,
}

/// Wrapper around the payment entity.
#[derive(Debug, Deserialize)]
pub struct PaymentWrapper {
    /// The payment entity.
    pub entity: PaymentEntity,
}

/// Payment entity.
#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    /// Provider payment ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Checkout notes carrying the student's details.
    pub notes: OrderNotes,
}

/// Checkout notes.
#[derive(Debug, Deserialize)]
pub struct OrderNotes {
    /// Purchased program: `Premium` or `Normal`.
    pub program: String,
    /// School class or grade.
    pub class: String,
    /// Contact email.
    pub email: String,
    /// Student name.
    pub name: String,
    /// Phone number.
    pub phone: String,
}

/// Public key response.
#[derive(Debug, Serialize)]
pub struct KeyResponse {
    /// Provider key id for the checkout page.
    pub key: String,
}

/// Payment confirmation posted by the checkout page.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Provider payment ID.
    pub razorpay_payment_id: String,
    /// Provider order ID.
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    /// Provider signature.
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

impl OrderNotes {
    fn into_new_student(self, today: chrono::NaiveDate) -> Result<NewStudent, ApiError> {
        let program = self.program.trim();
        if !SUBSCRIPTION_TIERS.contains(&program) {
            return Err(ApiError::Validation(format!(
                "program must be one of {SUBSCRIPTION_TIERS:?}, got {program:?}"
            )));
        }

        Ok(NewStudent {
            name: text::required("name", &self.name)?,
            phone: Phone::parse(&self.phone)?,
            email: Email::parse(&self.email)?,
            date: today,
            class: text::required("class", &self.class)?,
            sub: program.to_string(),
        })
    }
}

/// Enroll the student from a payment webhook.
pub async fn order(
    State(state): State<Arc<AppState>>,
    ApiJson(event): ApiJson<OrderEvent>,
) -> Result<Json<MessageResponse>, ApiError> {
    let entity = event.payload.payment.entity;
    let today = chrono::Local::now().date_naive();
    let student = entity.notes.into_new_student(today)?;

    let record = state.store.enroll(&student).await?;

    tracing::info!(
        student_id = record.id,
        payment_id = entity.id.as_deref().unwrap_or(""),
        sub = %record.sub,
        "Student enrolled from payment"
    );

    Ok(message("User data saved successfully"))
}

/// Hand the checkout page its public key id.
pub async fn get_key(State(state): State<Arc<AppState>>) -> Result<Json<KeyResponse>, ApiError> {
    state
        .config
        .payment_key_id
        .clone()
        .map(|key| Json(KeyResponse { key }))
        .ok_or_else(|| ApiError::NotFound("payment key is not configured".into()))
}

/// Send the browser back to the frontend with the payment reference.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Response, ApiError> {
    let reference = text::required("razorpay_payment_id", &body.razorpay_payment_id)?;

    tracing::info!(
        payment_id = %reference,
        order_id = body.razorpay_order_id.as_deref().unwrap_or(""),
        signed = body.razorpay_signature.is_some(),
        "Payment confirmation received"
    );

    let frontend = state.config.frontend_url.trim_end_matches('/');
    let location = format!("{frontend}/razor?reference={reference}");
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
