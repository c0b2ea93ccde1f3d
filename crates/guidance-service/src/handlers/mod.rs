//! API handlers.

pub mod health;
pub mod history;
pub mod mentors;
pub mod owners;
pub mod payments;
pub mod students;

use axum::extract::FromRequest;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;

/// `Json` extractor whose rejections render as [`ApiError`] bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

/// Wrap a message in a JSON body.
#[must_use]
pub fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}
