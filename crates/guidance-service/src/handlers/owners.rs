//! Owner account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use guidance_core::{text, Email, NewOwner, Owner};

use super::{message, ApiJson, MessageResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Owner creation request.
#[derive(Debug, Deserialize)]
pub struct CreateOwnerRequest {
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Display name.
    #[serde(rename = "ownername")]
    pub owner_name: String,
}

/// List every owner account.
pub async fn list_owners(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Owner>>, ApiError> {
    Ok(Json(state.store.list_owners().await?))
}

/// Create an owner account.
pub async fn create_owner(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateOwnerRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let owner = NewOwner {
        email: Email::parse(&body.email)?,
        owner_name: text::required("ownername", &body.owner_name)?,
    };
    let password_hash = state.passwords.hash(&body.password).await?;

    let record = state.store.create_owner(&owner, &password_hash).await?;

    tracing::info!(owner_id = record.id, email = %record.email, "Owner created");

    Ok(message("owner data saved successfully"))
}
