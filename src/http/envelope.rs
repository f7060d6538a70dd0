//! JSON envelope shared by the REST endpoints.
//!
//! ```text
//! {"success": true,  "result": ...}
//! {"success": false, "error": {"kind", "message", "exitCode"?, "stderr"?}}
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, Error, ExecError};

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct Success {
    success: bool,
    result: Value,
}

impl Success {
    /// Wraps `result`.
    pub const fn new(result: Value) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

/// Error details, also used as the payload of the SSE `error` event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable error kind (`validation`, `spawn`, `exit`, `timeout`, ...).
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Exit code of the CLI, when it exited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Stderr captured from the CLI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl From<&ExecError> for ErrorBody {
    fn from(e: &ExecError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            exit_code: e.exit_code(),
            stderr: e.stderr().filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(e: &Error) -> Self {
        match e {
            Error::Exec(exec) => exec.into(),
            other => Self {
                kind: other.kind(),
                message: other.to_string(),
                exit_code: None,
                stderr: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Failure {
    success: bool,
    error: ErrorBody,
}

/// An [`Error`] rendered as an error envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        let body = Failure {
            success: false,
            error: ErrorBody::from(&self.0),
        };
        (status, Json(body)).into_response()
    }
}

/// HTTP status for an error.
pub const fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) | Error::Config(ConfigError::MissingDirectory { .. }) => {
            StatusCode::BAD_REQUEST
        }
        Error::Exec(ExecError::Exit { .. }) => StatusCode::BAD_GATEWAY,
        Error::Exec(ExecError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        Error::Exec(ExecError::Spawn { .. }) | Error::Config(_) | Error::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
