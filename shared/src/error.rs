use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum SharedError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Date range error: start date {start} must be before end date {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Required field missing: {0}")]
    MissingField(String),
}

impl SharedError {
    /// True when a caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SharedError::Database(_) | SharedError::Upstream(_) | SharedError::Timeout(_)
        )
    }

    fn http_status(&self) -> StatusCode {
        match self {
            SharedError::Validation(_)
            | SharedError::BadRequest(_)
            | SharedError::Conversion(_)
            | SharedError::InvalidDateRange { .. }
            | SharedError::MissingField(_) => StatusCode::BAD_REQUEST,
            SharedError::NotFound(_) => StatusCode::NOT_FOUND,
            SharedError::Conflict(_) => StatusCode::CONFLICT,
            SharedError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SharedError::Database(_) | SharedError::Upstream(_) | SharedError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ResponseError for SharedError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.http_status()).json(self)
    }
}

impl From<validator::ValidationErrors> for SharedError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(error: serde_json::Error) -> Self {
        Self::Conversion(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SharedError>;
