use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the translation core.
///
/// Provider failures are only surfaced after the retry budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("translation provider error: {0}")]
    Provider(String),

    #[error("translation dropped markup: {0}")]
    MarkupMismatch(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid content: {0}")]
    InvalidContent(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// Whether the translator should spend another attempt on this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::MarkupMismatch(_))
    }
}

/// Structured error body returned by the HTTP layer.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl Error {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::InvalidContent(_) => (StatusCode::BAD_REQUEST, "INVALID_CONTENT"),
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Error::Provider(_) | Error::MarkupMismatch(_) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
            }
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Storage(_) | Error::Migration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "request failed: {}", self);
        }
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
