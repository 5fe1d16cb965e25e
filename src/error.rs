use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::middleware::logging::ErrorRecord;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    /// Delete refused because order history still references the row.
    #[error("{0}")]
    Protected(String),
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Maps a unique-constraint violation to `Conflict(message)`, anything else
    /// stays a database error.
    pub fn unique_or_db(err: DbErr, message: impl Into<String>) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ApiError::Conflict(message.into()),
            _ => ApiError::Db(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) | ApiError::Protected(_) => StatusCode::CONFLICT,
            ApiError::Db(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({
                "error": "Validation failed",
                "fields": errors,
            }),
            // Storage details stay in the log.
            ApiError::Db(_) | ApiError::Internal(_) => json!({
                "error": "Internal server error"
            }),
            other => json!({
                "error": other.to_string()
            }),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .extensions_mut()
            .insert(ErrorRecord(self.to_string()));
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
