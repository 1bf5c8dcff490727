use actix_web::{get, web, HttpResponse, Responder};
use arangors::client::reqwest::ReqwestClient;
use arangors::Database;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const PROBE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub checked_at: DateTime<Utc>,
    pub version: &'static str,
}

impl HealthResponse {
    fn now(status: &str) -> Self {
        Self {
            status: status.to_string(),
            checked_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Liveness probe. Never touches downstream dependencies.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::now("ok"))
}

#[derive(Serialize)]
struct ComponentProbe {
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

impl ComponentProbe {
    fn up(latency_ms: u64) -> Self {
        Self {
            healthy: true,
            detail: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn down(detail: String) -> Self {
        Self {
            healthy: false,
            detail: Some(detail),
            latency_ms: None,
        }
    }
}

async fn probe_arango(db: &Database<ReqwestClient>) -> ComponentProbe {
    let started = Instant::now();
    match timeout(PROBE_DEADLINE, db.info()).await {
        Ok(Ok(_)) => ComponentProbe::up(started.elapsed().as_millis() as u64),
        Ok(Err(e)) => ComponentProbe::down(format!("arangodb: {}", e)),
        Err(_) => ComponentProbe::down("arangodb: probe timed out".to_string()),
    }
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: String,
    checked_at: DateTime<Utc>,
    version: &'static str,
    components: Components,
}

#[derive(Serialize)]
struct Components {
    arangodb: ComponentProbe,
}

/// Readiness probe. Degraded (503) when the snapshot store is unreachable.
#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses(
        (status = 200, description = "All components reachable"),
        (status = 503, description = "A component is unreachable")
    )
)]
#[get("/health/detailed")]
pub async fn detailed_health_check(db: web::Data<Database<ReqwestClient>>) -> impl Responder {
    let arangodb = probe_arango(db.get_ref()).await;
    let degraded = !arangodb.healthy;

    let response = ReadinessResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        checked_at: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        components: Components { arangodb },
    };

    if degraded {
        HttpResponse::ServiceUnavailable().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}
