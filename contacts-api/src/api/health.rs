//! Root and health check endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /
pub async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Contacts API" }))
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "contacts-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build root and health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
}
