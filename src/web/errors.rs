//! # Web API Errors
//!
//! Maps orchestrator errors onto HTTP responses with a stable JSON body:
//!
//! ```json
//! {"error": {"code": "NOT_FOUND", "message": "Request not found: ..."}}
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::OrchestratorError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Circuit breaker is open")]
    CircuitBreakerOpen,

    #[error("Service temporarily unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::CircuitBreakerOpen | Self::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::DatabaseError { .. } | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Conflict { .. } => "CONFLICT",
            Self::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::RequestNotFound(_) | OrchestratorError::TaskNotFound(_) => {
                Self::not_found(err.to_string())
            }
            OrchestratorError::UnknownRequestType(_)
            | OrchestratorError::Validation(_)
            | OrchestratorError::WorkflowNotFound { .. } => Self::bad_request(err.to_string()),
            OrchestratorError::RequestTerminal { .. }
            | OrchestratorError::IllegalTransition { .. }
            | OrchestratorError::TaskNotReady { .. } => Self::conflict(err.to_string()),
            OrchestratorError::CircuitOpen { .. } => Self::CircuitBreakerOpen,
            OrchestratorError::DispatchFailed(message) => Self::ServiceUnavailable { message },
            OrchestratorError::Store(store_err) => {
                error!(error = %store_err, "Store operation failed behind API call");
                Self::DatabaseError {
                    operation: "request store".to_string(),
                }
            }
            OrchestratorError::Configuration(message) => {
                error!(error = %message, "Configuration error behind API call");
                Self::Internal
            }
        }
    }
}

/// Malformed or incomplete JSON bodies are client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
