//! Shared test helpers for contacts-api integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use contacts_api::live::SubscriberRegistry;
use contacts_api::{build_router, AppState};
use contacts_common::channel::{ChangeChannel, MemoryChannel, CONTACT_CHANGES};
use contacts_common::db::{init_database, ContactFields};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt; // for `oneshot` method

/// Fully wired service over a temporary database
pub struct TestContext {
    pub dir: TempDir,
    pub db_url: String,
    pub pool: SqlitePool,
    pub channel: Arc<dyn ChangeChannel>,
    pub registry: Arc<SubscriberRegistry>,
    pub shutdown: CancellationToken,
    pub state: AppState,
}

impl TestContext {
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), None)
    }
}

/// Test helper: temporary database + in-process change channel
pub async fn setup() -> TestContext {
    let channel: Arc<dyn ChangeChannel> = Arc::new(MemoryChannel::new(CONTACT_CHANGES));
    setup_with_channel(channel).await
}

pub async fn setup_with_channel(channel: Arc<dyn ChangeChannel>) -> TestContext {
    let dir = TempDir::new().expect("Should create temp dir");
    let db_url = format!("sqlite://{}", dir.path().join("contacts.db").display());
    let pool = init_database(&db_url).await.expect("Should init database");
    let registry = SubscriberRegistry::new();
    let shutdown = CancellationToken::new();
    let state = AppState::new(pool.clone(), channel.clone(), registry.clone(), shutdown.clone());

    TestContext {
        dir,
        db_url,
        pool,
        channel,
        registry,
        shutdown,
        state,
    }
}

pub fn fields(first: &str, email: &str) -> ContactFields {
    ContactFields {
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        email: email.to_string(),
        phone: "555-0100".to_string(),
    }
}

pub fn contact_body(first: &str, email: &str) -> Value {
    json!({
        "first_name": first,
        "last_name": "Tester",
        "email": email,
        "phone": "555-0100",
    })
}

/// Test helper: build request with optional JSON body
pub fn test_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: send request, return status and JSON body (Null if empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Test helper: POST a contact and return its JSON
pub async fn create(app: &Router, first: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        test_request("POST", "/contacts", Some(contact_body(first, email))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {}", body);
    body
}

pub async fn history_count(pool: &SqlitePool, contact_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE contact_id = ?")
        .bind(contact_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
