use std::sync::Arc;

use actix_web::{post, web, HttpResponse};
use shared::dto::activity::ActivityRecordedDto;
use validator::Validate;

use crate::error::ApiError;

use super::events::{ActivityEventHandler, ActivityRecorded};

/// Ingest an activity-recorded event
#[utoipa::path(
    post,
    path = "/api/internal/activities",
    responses(
        (status = 202, description = "Event accepted and applied"),
        (status = 400, description = "Invalid event payload", body = ApiError)
    ),
    tag = "internal"
)]
#[post("")]
pub async fn record_activity_handler(
    event_dto: web::Json<ActivityRecordedDto>,
    handlers: web::Data<Vec<Arc<dyn ActivityEventHandler>>>,
) -> Result<HttpResponse, ApiError> {
    event_dto.validate()?;
    let event = ActivityRecorded {
        record: event_dto.into_inner().into_record(),
    };
    for handler in handlers.iter() {
        handler.on_activity_recorded(&event).await?;
    }
    Ok(HttpResponse::Accepted().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/internal/activities").service(record_activity_handler));
}
