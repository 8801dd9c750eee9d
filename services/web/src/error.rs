//! Error type for the web handlers and middleware

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::ModelError;
use thiserror::Error;
use tracing::error;

use crate::templates::TemplateError;

/// Everything a handler can fail with
#[derive(Error, Debug)]
pub enum AppError {
    /// No such page or record
    #[error("Not Found")]
    NotFound,

    /// The request itself is at fault
    #[error("client error: {0}")]
    Client(StatusCode),

    /// Repository failure the handler did not expect
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Server(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Client(status) => *status,
            AppError::Model(_) | AppError::Template(_) | AppError::Server(_) => {
                error!(error = ?self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason.to_string()).into_response()
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;
