//! Owner accounts.

use serde::Serialize;

use crate::ids::Email;

/// A program owner account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    /// Surrogate row ID.
    pub id: i64,
    /// Login email. Unique.
    pub email: Email,
    /// Password hash. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    /// Display name.
    #[serde(rename = "ownername")]
    pub owner_name: String,
}

/// Input for creating an owner account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwner {
    /// Login email.
    pub email: Email,
    /// Display name.
    pub owner_name: String,
}
