//! API error types and their HTTP mappings.
//!
//! Field clients key off the response body shapes, so the mappings are
//! fixed contract:
//!
//! ```text
//! sync failure      → 500 { "error": "Sync failed", "details": "<message>" }
//! bad credentials   → 401 { "error": "Invalid credentials" }
//! login breakage    → 500 { "error": "Login failed" }
//! anything else     → 500 { "error": "Internal server error" }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use waterline_db::DbError;
use waterline_sync::SyncError;

/// Error type for the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The sync cascade aborted.
    #[error("Sync failed: {0}")]
    SyncFailed(SyncError),

    /// The upstream rejected the login credentials.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Login broke for a reason other than bad credentials (upstream
    /// unreachable, unexpected payload, session storage failure).
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// A local database read failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::SyncFailed(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Sync failed", "details": err.to_string() }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid credentials" }),
            ),
            ApiError::LoginFailed(reason) => {
                error!(%reason, "Login failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Login failed" }),
                )
            }
            ApiError::Database(err) => {
                error!(error = %err, "Database error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Unauthorized => ApiError::InvalidCredentials,
            other => ApiError::SyncFailed(other),
        }
    }
}
