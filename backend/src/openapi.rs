use crate::error::ApiError;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health::health_check,
        crate::health::detailed_health_check,
        crate::leaderboard::controller::get_leaderboard_handler,
        crate::leaderboard::controller::get_position_handler,
        crate::activity::controller::record_activity_handler,
    ),
    components(schemas(
        crate::health::HealthResponse,
        ApiError,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "leaderboards", description = "Materialized leaderboard snapshots and subject positions"),
        (name = "internal", description = "Service-to-service event ingestion"),
    ),
    info(
        title = "Trackline Leaderboard API",
        description = "Leaderboard materialization service for the Trackline fitness platform.\n\n## Identity\n\nUser identity is established by the auth gateway and forwarded in the `X-Subject-Id` header. Endpoints that report the caller's own standing require it; the leaderboard read endpoint treats it as optional.",
        version = "0.3.2",
        contact(
            name = "API Support",
            email = "backend@trackline.app"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:50010", description = "Development server"),
    )
)]
pub struct ApiDoc;
