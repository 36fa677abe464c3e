//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! mapping onto HTTP responses. Internal detail is logged server-side;
//! clients only ever see the sanitized shapes below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;
use diary_core::ports::{PortError, RenderError};

/// A single field-level validation failure, reported under a 400.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing request fields, reported per field.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// The entry does not exist or belongs to another user. The two cases
    /// are deliberately indistinguishable.
    #[error("Entry not found")]
    NotFound,

    /// The entry is passcode-protected and no (valid) passcode was given
    /// where one is required to proceed.
    #[error("Passcode required")]
    PasscodeRequired,

    /// A failure inside the HTML-to-PDF pipeline.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Represents an error that propagated up from one of the core
    /// service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding a socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::PasscodeRequired => StatusCode::FORBIDDEN,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({ "errors": errors }),
            ApiError::NotFound | ApiError::Port(PortError::NotFound(_)) => {
                json!({ "error": "Entry not found" })
            }
            ApiError::PasscodeRequired => json!({ "requiresPasscode": true }),
            ApiError::Port(PortError::Conflict(msg)) => json!({ "error": msg }),
            ApiError::Render(e) => {
                error!("PDF rendering failed: {e}");
                json!({ "error": format!("Failed to generate PDF: {e}") })
            }
            other => {
                // Full detail stays in the server log.
                error!("Internal error: {other:?}");
                json!({ "error": "Server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
