use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use backend::activity::{ActivityEventHandler, ArangoActivityReader, StatsHandler};
use backend::leaderboard::{AggregatorRegistry, LeaderboardService, SnapshotRepository};
use backend::metrics::Metrics;
use backend::openapi::ApiDoc;
use backend::profile::{ArangoProfileReader, CachedProfileReader};
use log::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match backend::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    match Metrics::new() {
        Ok(metrics) => Metrics::set_global(Arc::new(metrics)),
        Err(e) => log::warn!("Failed to initialize metrics: {}", e),
    }

    let conn = match arangors::Connection::establish_basic_auth(
        &config.database.url,
        &config.database.username,
        &config.database.password,
    )
    .await
    {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to ArangoDB: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e.to_string(),
            ));
        }
    };

    let db = match conn.db(&config.database.name).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to get ArangoDB database: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()));
        }
    };

    let activity_reader = Arc::new(ArangoActivityReader::new(db.clone()));
    let profile_reader = Arc::new(CachedProfileReader::new(
        Arc::new(ArangoProfileReader::new(db.clone())),
        Duration::from_secs(config.leaderboard.profile_cache_ttl_secs),
    ));
    let snapshot_store = Arc::new(SnapshotRepository::new(db.clone()));

    let leaderboard_service = web::Data::new(LeaderboardService::new(
        snapshot_store,
        activity_reader,
        profile_reader,
        AggregatorRegistry::with_defaults(),
        config.leaderboard.entry_limit,
        Duration::from_secs(config.leaderboard.aggregation_timeout_secs),
    ));

    let event_handlers: Vec<Arc<dyn ActivityEventHandler>> =
        vec![Arc::new(StatsHandler::new(db.clone()))];
    let event_handlers = web::Data::new(event_handlers);

    let db_data = web::Data::new(db);

    log::info!(
        "Starting server on {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(backend::middleware::RequestLog)
            .wrap(backend::middleware::SecurityHeaders)
            .wrap(backend::middleware::cors_middleware())
            .app_data(web::JsonConfig::default().limit(256 * 1024))
            .app_data(db_data.clone())
            .app_data(leaderboard_service.clone())
            .app_data(event_handlers.clone())
            .service(backend::health::health_check)
            .service(backend::health::detailed_health_check)
            .service(backend::metrics::metrics_handler)
            .configure(backend::leaderboard::controller::configure_routes)
            .configure(backend::activity::controller::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .workers(config.server.workers)
    .run()
    .await
}
