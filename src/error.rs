//! Error type shared by the store, the export layer and the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// User input that cannot be accepted as submitted. The message is shown
    /// to the user next to the form they filled in.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation would break referential integrity or a uniqueness rule.
    #[error("{0}")]
    Conflict(String),

    #[error("export failed: {0}")]
    Export(String),

    /// The PDF converter is not installed or not configured.
    #[error("PDF export unavailable: {0}")]
    ExportUnavailable(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Template(#[from] tera::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ExportUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Export(_) | Self::Database(_) | Self::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Client errors are returned as-is. Internal errors are logged in full and
/// the client only sees a generic message.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Internal error: {}", self);
            let msg = match self {
                Self::ExportUnavailable(_) => self.to_string(),
                _ => "Internal server error".to_string(),
            };
            return (status, msg).into_response();
        }

        tracing::warn!("Request rejected ({}): {}", status, self);
        (status, self.to_string()).into_response()
    }
}
