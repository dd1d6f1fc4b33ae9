//! Error types for contacts-api
//!
//! Only missing contacts and unique-constraint conflicts are user-visible.
//! Everything else is logged and reported as a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contacts_common::error::title_case;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint conflict (400)
    #[error("Oops! {} already exists", title_case(.field))]
    AlreadyExists { field: String },

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<contacts_common::Error> for ApiError {
    fn from(err: contacts_common::Error) -> Self {
        match err {
            contacts_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            contacts_common::Error::UniqueViolation { field } => ApiError::AlreadyExists { field },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            ApiError::Internal(ref detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            ref other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
