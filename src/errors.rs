use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure class of a webhook call that never produced a usable 2xx reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamKind {
    Timeout,
    Connection,
    Status(u16),
    Transport,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamKind::Timeout => write!(f, "timeout"),
            UpstreamKind::Connection => write!(f, "connection failure"),
            UpstreamKind::Status(code) => write!(f, "HTTP {code}"),
            UpstreamKind::Transport => write!(f, "transport error"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct UpstreamFailure {
    pub kind: UpstreamKind,
    pub detail: String,
}

impl UpstreamFailure {
    pub fn new(kind: UpstreamKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("webhook {0}")]
    Upstream(#[from] UpstreamFailure),

    #[error("unexpected webhook response: {0}")]
    UpstreamContract(String),
}

impl RelayError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RelayError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the HTTP invoke surface. Tool outcomes themselves are
/// always strings and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
