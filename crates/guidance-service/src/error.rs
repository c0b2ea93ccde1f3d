//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use guidance_core::{GuidanceError, KeyError};
use guidance_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A unique natural key is already taken.
    #[error("{0}")]
    Duplicate(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Assigning more students would exceed a mentor's capacity.
    #[error("{0}")]
    CapacityExceeded(String),

    /// The request conflicts with the current state of a record.
    #[error("{0}")]
    Conflict(String),

    /// A re-enrollment arrived inside the minimum window.
    #[error("{0}")]
    TooSoon(String),

    /// The supplied password does not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ApiError {
    /// The HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Duplicate(_)
            | Self::TooSoon(_)
            | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CapacityExceeded(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Duplicate(_) => "duplicate_key",
            Self::NotFound(_) => "not_found",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::Conflict(_) => "conflict",
            Self::TooSoon(_) => "too_soon",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: self.code(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<GuidanceError> for ApiError {
    fn from(err: GuidanceError) -> Self {
        match err {
            GuidanceError::Validation(_)
            | GuidanceError::CapacityBelowLoad { .. }
            | GuidanceError::InvalidKey(_) => Self::Validation(err.to_string()),
            GuidanceError::CapacityExceeded { .. } => Self::CapacityExceeded(err.to_string()),
            GuidanceError::TooSoon { .. } => Self::TooSoon(err.to_string()),
        }
    }
}

impl From<KeyError> for ApiError {
    fn from(err: KeyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Duplicate { .. } => Self::Duplicate(err.to_string()),
            StoreError::AlreadyLinked { .. } => Self::Conflict(err.to_string()),
            StoreError::Rule(rule) => rule.into(),
            StoreError::Database(msg) | StoreError::Decode(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_errors_keep_their_status() {
        let exceeded: ApiError = StoreError::Rule(GuidanceError::CapacityExceeded {
            mentor: "Meera".into(),
            load: 5,
            capacity: 5,
            requested: 1,
        })
        .into();
        assert_eq!(exceeded.status(), StatusCode::CONFLICT);
        assert_eq!(exceeded.code(), "capacity_exceeded");

        let too_soon: ApiError = GuidanceError::TooSoon {
            elapsed_days: 3,
            min_days: 30,
        }
        .into();
        assert_eq!(too_soon.status(), StatusCode::BAD_REQUEST);

        let below: ApiError = GuidanceError::CapacityBelowLoad {
            capacity: 1,
            load: 2,
        }
        .into();
        assert_eq!(below.code(), "validation_error");
    }

    #[test]
    fn store_errors_map_to_client_or_server_status() {
        let missing: ApiError = StoreError::not_found("mentor", "Meera").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "mentor not found: Meera");

        let duplicate: ApiError = StoreError::duplicate("student", "phone", "9000000001").into();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

        let linked: ApiError = StoreError::AlreadyLinked {
            student: 7,
            mentor: "Meera".into(),
        }
        .into();
        assert_eq!(linked.status(), StatusCode::CONFLICT);
        assert_eq!(linked.code(), "conflict");

        let db: ApiError = StoreError::Database("connection reset".into()).into();
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
