use std::fmt;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Errors returned by dashboard operations.
#[derive(Debug)]
pub enum DashboardError {
    /// A client-supplied path resolved outside the workspace root.
    AccessDenied(String),
    /// Requested file or directory does not exist.
    NotFound(String),
    /// The gateway answered with an envelope whose `ok` is not `true`.
    /// Carries the envelope so it can be handed back to the caller verbatim.
    Upstream(Value),
    /// The request to the gateway failed outright (connect, timeout, bad JSON).
    Network(String),
    /// Invalid input.
    Validation(String),
    /// Missing or wrong dashboard API token.
    Unauthorized(String),
    /// Local filesystem or serialization failure.
    Storage(String),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::AccessDenied(msg) => write!(f, "Access denied: {msg}"),
            DashboardError::NotFound(msg) => write!(f, "File not found: {msg}"),
            DashboardError::Upstream(envelope) => write!(f, "gateway error: {envelope}"),
            DashboardError::Network(msg) => write!(f, "{msg}"),
            DashboardError::Validation(msg) => write!(f, "validation error: {msg}"),
            DashboardError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            DashboardError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for DashboardError {}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::AccessDenied(_) => StatusCode::FORBIDDEN,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Upstream(_) | DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DashboardError::Network(_) | DashboardError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => DashboardError::NotFound(err.to_string()),
            _ => DashboardError::Storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Storage(err.to_string())
    }
}

impl From<JsonRejection> for DashboardError {
    fn from(rejection: JsonRejection) -> Self {
        DashboardError::Validation(rejection.body_text())
    }
}

/// Every failure leaves the server as a JSON body. Upstream envelopes are
/// passed through untouched; everything else becomes `{"error": "..."}`.
impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            DashboardError::Upstream(envelope) => (status, Json(envelope)).into_response(),
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
