use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use shared::SharedError;
use std::fmt;
use utoipa::ToSchema;

/// JSON error envelope for every non-2xx response from this service.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ApiError {
    fn envelope(code: &str, message: &str, status: StatusCode) -> Self {
        Self {
            error: code.to_string(),
            message: message.to_string(),
            status_code: status.as_u16(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::envelope("BAD_REQUEST", message, StatusCode::BAD_REQUEST)
    }

    #[allow(dead_code)]
    pub fn not_found(message: &str) -> Self {
        Self::envelope("NOT_FOUND", message, StatusCode::NOT_FOUND)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::envelope("INTERNAL_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn database_error(message: &str) -> Self {
        Self::envelope("DATABASE_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn validation_error(message: &str) -> Self {
        Self::envelope("VALIDATION_ERROR", message, StatusCode::BAD_REQUEST)
    }

    pub fn timeout(message: &str) -> Self {
        Self::envelope("TIMEOUT", message, StatusCode::GATEWAY_TIMEOUT)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl From<SharedError> for ApiError {
    fn from(err: SharedError) -> Self {
        match &err {
            SharedError::Validation(m) => Self::validation_error(m),
            SharedError::BadRequest(m) | SharedError::MissingField(m) => Self::bad_request(m),
            SharedError::NotFound(m) => Self::not_found(m),
            SharedError::Timeout(m) => Self::timeout(m),
            SharedError::Database(m) => Self::database_error(m),
            _ => Self::internal_error(&err.to_string()),
        }
    }
}

impl From<arangors::ClientError> for ApiError {
    fn from(err: arangors::ClientError) -> Self {
        Self::database_error(&err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(&format!("Malformed JSON: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::validation_error(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelopes_carry_code_and_status() {
        let error = ApiError::bad_request("scope national requires geo_code");
        assert_eq!(error.error, "BAD_REQUEST");
        assert_eq!(error.status_code, 400);
        assert_eq!(error.error_response().status().as_u16(), 400);
    }

    #[test]
    fn display_joins_code_and_message() {
        let error = ApiError::timeout("aggregation exceeded 20s");
        assert_eq!(format!("{}", error), "TIMEOUT: aggregation exceeded 20s");
    }

    #[test]
    fn shared_errors_map_to_http_classes() {
        let error: ApiError = SharedError::Timeout("aggregation too slow".into()).into();
        assert_eq!(error.error, "TIMEOUT");
        assert_eq!(error.status_code, 504);

        let error: ApiError = SharedError::MissingField("geo_qualifier".into()).into();
        assert_eq!(error.status_code, 400);

        let error: ApiError = SharedError::Upstream("track store down".into()).into();
        assert_eq!(error.error, "INTERNAL_ERROR");
        assert_eq!(error.status_code, 500);
    }

    #[test]
    fn arangors_failures_become_database_errors() {
        let error: ApiError = arangors::ClientError::InvalidServer("nope".to_string()).into();
        assert_eq!(error.error, "DATABASE_ERROR");
        assert_eq!(error.status_code, 500);
    }

    #[test]
    fn validation_errors_become_400s() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        errors.add("distance_m", ValidationError::new("range"));
        let error: ApiError = errors.into();
        assert_eq!(error.error, "VALIDATION_ERROR");
        assert_eq!(error.status_code, 400);
    }
}
