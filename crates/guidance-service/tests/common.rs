//! Common test utilities for guidance integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use guidance_service::{create_router, AppState, ServiceConfig};
use guidance_store::MemoryStore;

/// Key id the harness configures for `/getkey`.
pub const PAYMENT_KEY_ID: &str = "rzp_test_key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and inspection.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new test harness with an empty store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            password_hash_cost: 4,
            frontend_url: "http://localhost:3000".into(),
            payment_key_id: Some(PAYMENT_KEY_ID.into()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Enroll a student through `POST /`.
    pub async fn enroll(&self, name: &str, phone: &str, date: &str) -> TestResponse {
        self.server
            .post("/")
            .json(&json!({
                "name": name,
                "phone": phone,
                "email": format!("{}@example.com", name.to_lowercase()),
                "date": date,
                "class": "10",
                "sub": "Normal",
            }))
            .await
    }

    /// Register a mentor through `POST /mentorData` and give them capacity.
    pub async fn mentor(&self, name: &str, phone: &str, capacity: i32) {
        self.server
            .post("/mentorData")
            .json(&json!({
                "name": name,
                "college": "IIT",
                "date": "2024-01-01",
                "phone": phone,
                "email": format!("{}@mentors.example.com", name.to_lowercase()),
                "password": "initial-password",
            }))
            .await
            .assert_status_ok();

        self.server
            .post("/api/update")
            .json(&json!({ "mentorName": name, "studentCount": capacity }))
            .await
            .assert_status_ok();
    }

    /// Every roster record.
    pub async fn students(&self) -> Vec<Value> {
        self.server.get("/api/data").await.json()
    }

    /// The roster ID for a phone.
    pub async fn student_id(&self, phone: &str) -> i64 {
        self.students()
            .await
            .iter()
            .find(|s| s["phone"] == phone)
            .and_then(|s| s["id"].as_i64())
            .expect("student not on roster")
    }

    /// A mentor record by name.
    pub async fn mentor_record(&self, name: &str) -> Value {
        let mentors: Vec<Value> = self.server.get("/api/mentorData").await.json();
        mentors
            .into_iter()
            .find(|m| m["name"] == name)
            .expect("mentor not registered")
    }

    /// Assign students to a mentor through `POST /api/finalMentor`.
    pub async fn assign(&self, mentor: &str, ids: &[i64]) -> TestResponse {
        self.server
            .post("/api/finalMentor")
            .json(&json!({ "mentorName": mentor, "ids": ids }))
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
