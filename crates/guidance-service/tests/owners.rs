//! Owner account integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn owner_is_created_and_listed_without_password() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/ownerData")
        .json(&json!({
            "email": "Owner@Example.com",
            "password": "s3cret",
            "ownername": "Priya",
        }))
        .await
        .assert_status_ok();

    let owners: Vec<Value> = harness.server.get("/api/ownerData").await.json();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0]["email"], "owner@example.com");
    assert_eq!(owners[0]["ownername"], "Priya");
    assert!(owners[0].get("password").is_none());
    assert!(owners[0].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_owner_email_is_rejected() {
    let harness = TestHarness::new();
    let body = json!({
        "email": "owner@example.com",
        "password": "s3cret",
        "ownername": "Priya",
    });

    harness
        .server
        .post("/ownerData")
        .json(&body)
        .await
        .assert_status_ok();
    harness
        .server
        .post("/ownerData")
        .json(&body)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
