//! Event domain error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::mapper::MapError;

/// Result type for event operations
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised by a backend implementation (HTTP client or in-memory store)
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// A storage constraint refused the write
    #[error("{0}")]
    Constraint(String),
}

impl BackendError {
    /// The message as the backend reported it, without our prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Constraint(message) | Self::Decode(message) => message.clone(),
            Self::Http(e) => e.to_string(),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Event domain errors
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Admin privileges required")]
    Forbidden,

    /// The backend refused a submission; message is passed through verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Backend failure: {0}")]
    BackendFailure(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed event row: {0}")]
    Mapping(#[from] MapError),
}

impl From<BackendError> for EventError {
    fn from(err: BackendError) -> Self {
        Self::BackendFailure(err.message())
    }
}

impl From<ValidationErrors> for EventError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Standard error body
///
/// ```json
/// { "code": 1007, "error": "FORBIDDEN", "message": "Admin privileges required" }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier
    pub error: String,
    /// Human-readable message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EventError {
    fn status_and_code(&self) -> (StatusCode, &'static str, i32) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", 1001),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", 1006),
            Self::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", 1006),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", 1007),
            Self::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_ENTITY", 1009),
            Self::BackendFailure(_) => (StatusCode::BAD_GATEWAY, "BACKEND_FAILURE", 2003),
            Self::Mapping(_) => (StatusCode::BAD_GATEWAY, "MALFORMED_ROW", 2010),
        }
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let (status, error, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error_code = code, error = %self, "Event request failed");
        } else {
            tracing::info!(error_code = code, error = %self, "Event request refused");
        }

        let body = ErrorResponse {
            code,
            error: error.to_string(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}
