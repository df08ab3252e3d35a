use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::ValidationError;
use log::{error, warn};
use serde::Serialize;

/// Outcome of a store operation other than success.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Incident with ID {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err.0)
    }
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body: `{ statusCode, message, error }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: ErrorMessage,
    pub error: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            StoreError::Validation(messages) => {
                warn!("Rejected request: {}", messages.join("; "));
                ErrorMessage::Many(messages)
            }
            StoreError::NotFound(id) => ErrorMessage::One(format!("Incident with ID {id} not found")),
            StoreError::Database(e) => {
                error!("Database error: {}", e);
                ErrorMessage::One("Internal server error".to_string())
            }
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            error: status.canonical_reason().unwrap_or("Error"),
        };
        (status, Json(body)).into_response()
    }
}
