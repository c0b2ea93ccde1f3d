//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, history, mentors, owners, payments, students};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for `/api` endpoints. Batch assignment and the
/// deletion sweep fan out further inside one request.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent requests for the root-level form and webhook endpoints.
const FORM_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Roster
/// - `GET /api/data` - List students
/// - `GET /data_without_mentor` - List students without a mentor
/// - `POST /` - Enroll a student
/// - `POST /student/:phone` - Update a student and move them to another mentor
/// - `DELETE /api/delete` - Deletion sweep over recent enrollments
///
/// ## Mentors
/// - `GET /api/mentorData` - List mentors
/// - `POST /mentorData` - Register a mentor and their login
/// - `POST /api/update` - Set a mentor's capacity
/// - `POST /mentorupdate/:phone` - Update a mentor's profile and login
/// - `POST /api/finalMentor` - Capacity-checked batch assignment
/// - `GET /api/deletableMentors` - List mentors with no students
/// - `DELETE /api/mentor` - Delete idle mentors
/// - `POST /change-password` - Change a mentor's password
///
/// ## History
/// - `GET /api/renrollData` - List re-enrollment history
/// - `POST /renrollment` - Re-enroll a student
///
/// ## Owners
/// - `GET /api/ownerData` - List owners
/// - `POST /ownerData` - Create an owner
///
/// ## Payments
/// - `POST /order` - Payment webhook, enrolls the paying student
/// - `GET /getkey` - Checkout key id
/// - `POST /api/paymentverify` - Redirect back to the frontend
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Roster
        .route("/data", get(students::list_students))
        .route("/delete", delete(students::delete_recent))
        // Mentors
        .route("/mentorData", get(mentors::list_mentors))
        .route("/update", post(mentors::set_capacity))
        .route("/finalMentor", post(mentors::assign))
        .route("/deletableMentors", get(mentors::list_deletable))
        .route("/mentor", delete(mentors::delete_idle))
        // History
        .route("/renrollData", get(history::list_history))
        // Owners
        .route("/ownerData", get(owners::list_owners))
        // Payments
        .route("/paymentverify", post(payments::verify))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    let form_routes = Router::new()
        .route("/", post(students::enroll))
        .route("/data_without_mentor", get(students::list_unassigned))
        .route("/student/:phone", post(students::transfer))
        .route("/mentorData", post(mentors::register))
        .route("/mentorupdate/:phone", post(mentors::update_profile))
        .route("/change-password", post(mentors::change_password))
        .route("/renrollment", post(history::reenroll))
        .route("/ownerData", post(owners::create_owner))
        .route("/order", post(payments::order))
        .route("/getkey", get(payments::get_key))
        .layer(ConcurrencyLimitLayer::new(FORM_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .merge(form_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
