use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::ApiError;

/// Authenticated subject identity, forwarded by the auth gateway in the
/// `X-Subject-Id` header. Extract as `Option<SubjectId>` on endpoints
/// where identity is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectId(pub String);

impl FromRequest for SubjectId {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let subject = req
            .headers()
            .get("X-Subject-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        ready(match subject {
            Some(s) => Ok(SubjectId(s.to_string())),
            None => Err(ApiError::bad_request("Missing X-Subject-Id header")),
        })
    }
}
