//! Guidance HTTP API Service.
//!
//! This crate provides the HTTP API for the mentorship programme:
//!
//! - Student enrollment, reassignment and the deletion sweep
//! - Mentor registration, capacity and capacity-checked batch assignment
//! - Re-enrollment history with a 30-day gate
//! - Mentor credentials and owner accounts
//! - Payment webhook glue
//!
//! # Storage
//!
//! Handlers talk to an `Arc<dyn Store>`: PostgreSQL in production, the
//! in-memory store for tests and for local runs without `DATABASE_URL`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router

pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod workflows;

pub use config::ServiceConfig;
pub use crypto::PasswordHasher;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
