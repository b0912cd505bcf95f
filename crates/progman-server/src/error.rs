//! Manager and API error types.
//!
//! [`ManagerError`] is what [`ProgramManager`](crate::service::ProgramManager)
//! returns. [`ApiError`] is the HTTP face of it: it implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use progman_core::{CoreError, ProgramId};
use progman_runner::RunnerError;
use progman_storage::StorageError;

/// Failures surfaced by the program manager. None are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The referenced program does not exist.
    #[error("program not found: {0}")]
    NotFound(ProgramId),

    /// An execution session is already in progress.
    #[error("a program is already running")]
    AlreadyRunning,

    /// Either backing store failed.
    #[error(transparent)]
    Storage(StorageError),

    /// The execution context could not start the body.
    #[error("program failed to launch: {0}")]
    LaunchFailure(String),

    /// The caller passed something unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Autorun was requested but is disabled or has no program.
    #[error("autorun is not configured")]
    AutorunNotConfigured,
}

impl From<StorageError> for ManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ProgramNotFound(raw) => match ProgramId::parse(&raw) {
                Ok(id) => ManagerError::NotFound(id),
                Err(_) => ManagerError::Storage(StorageError::ProgramNotFound(raw)),
            },
            other => ManagerError::Storage(other),
        }
    }
}

impl From<RunnerError> for ManagerError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::AlreadyRunning => ManagerError::AlreadyRunning,
            RunnerError::LaunchFailure(reason) => ManagerError::LaunchFailure(reason),
        }
    }
}

impl From<CoreError> for ManagerError {
    fn from(err: CoreError) -> Self {
        ManagerError::InvalidInput(err.to_string())
    }
}

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entity not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),

    /// Resource conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        };

        let body = serde_json::json!({
            "success": false,
            "error": ApiErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match &err {
            ManagerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ManagerError::AlreadyRunning => ApiError::Conflict(err.to_string()),
            ManagerError::InvalidInput(_) | ManagerError::AutorunNotConfigured => {
                ApiError::BadRequest(err.to_string())
            }
            ManagerError::LaunchFailure(_) | ManagerError::Storage(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_becomes_manager_not_found() {
        let err: ManagerError = StorageError::ProgramNotFound("abc".to_string()).into();
        assert!(matches!(err, ManagerError::NotFound(id) if id.as_str() == "abc"));
    }

    #[test]
    fn runner_errors_keep_their_meaning() {
        assert!(matches!(
            ManagerError::from(RunnerError::AlreadyRunning),
            ManagerError::AlreadyRunning
        ));
        assert!(matches!(
            ManagerError::from(RunnerError::LaunchFailure("no python".into())),
            ManagerError::LaunchFailure(reason) if reason == "no python"
        ));
    }

    #[test]
    fn api_status_codes() {
        let id = ProgramId::parse("p").unwrap();
        let cases = [
            (ManagerError::NotFound(id), StatusCode::NOT_FOUND),
            (ManagerError::AlreadyRunning, StatusCode::CONFLICT),
            (ManagerError::InvalidInput("blank".into()), StatusCode::BAD_REQUEST),
            (ManagerError::AutorunNotConfigured, StatusCode::BAD_REQUEST),
            (ManagerError::LaunchFailure("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
