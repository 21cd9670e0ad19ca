//! Application error type shared by every layer.
//!
//! Each variant carries a human-readable `message` and structured JSON `details`.
//! [`IntoResponse`] renders the error as:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "...", "details": {} } }
//! ```
//!
//! Redirect-path failures (`InvalidId`, `NotFound`, `Expired`) all render as the same
//! `404 Not Found` so a visitor cannot tell an expired link from one that never existed.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Request payload failed validation.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Supplied identifier is not a well-formed link id.
    #[error("{message}")]
    InvalidId { message: String, details: Value },

    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// Link exists but its expiration time has passed.
    #[error("{message}")]
    Expired { message: String, details: Value },

    /// Underlying store operation failed.
    #[error("{message}")]
    Storage { message: String, details: Value },

    /// A background task of the request failed unexpectedly.
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn invalid_id(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidId {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn expired(message: impl Into<String>, details: Value) -> Self {
        Self::Expired {
            message: message.into(),
            details,
        }
    }

    pub fn storage(message: impl Into<String>, details: Value) -> Self {
        Self::Storage {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns true for the errors a redirect treats as "no such link".
    pub fn is_not_found_like(&self) -> bool {
        matches!(
            self,
            Self::InvalidId { .. } | Self::NotFound { .. } | Self::Expired { .. }
        )
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidId { .. } | Self::NotFound { .. } | Self::Expired { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into its client-facing payload.
    ///
    /// `InvalidId` and `Expired` are reported as plain `not_found`.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            Self::Validation { message, details } => ErrorInfo {
                code: "validation_error",
                message: message.clone(),
                details: details.clone(),
            },
            Self::Unauthorized { message, details } => ErrorInfo {
                code: "unauthorized",
                message: message.clone(),
                details: details.clone(),
            },
            Self::InvalidId { .. } | Self::NotFound { .. } | Self::Expired { .. } => ErrorInfo {
                code: "not_found",
                message: "Link not found or expired".to_string(),
                details: json!({}),
            },
            Self::Storage { message, details } | Self::Internal { message, details } => {
                ErrorInfo {
                    code: "internal_error",
                    message: message.clone(),
                    details: details.clone(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response();
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::storage("Database error", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::bad_request("Validation failed", json!({ "errors": e.to_string() }))
    }
}
