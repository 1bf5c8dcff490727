use actix_web::{get, web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use shared::dto::leaderboard::{LeaderboardQuery, LeaderboardResponseDto, UserStatusDto};
use shared::{Metric, PeriodKind, Scope};

use crate::error::ApiError;
use crate::identity::SubjectId;

use super::position::SubjectPosition;
use super::usecase::{LeaderboardRequest, LeaderboardService};

fn parse_metric(raw: &str) -> Result<Metric, ApiError> {
    raw.parse().map_err(|e: String| ApiError::bad_request(&e))
}

fn parse_period_kind(raw: &str) -> Result<PeriodKind, ApiError> {
    raw.parse().map_err(|e: String| ApiError::bad_request(&e))
}

fn parse_scope(raw: Option<&str>) -> Result<Scope, ApiError> {
    match raw {
        None => Ok(Scope::Global),
        Some(s) => s.parse().map_err(|e: String| ApiError::bad_request(&e)),
    }
}

/// Accepts RFC 3339 timestamps or bare ISO dates; absent means now.
fn parse_reference_date(raw: Option<&str>) -> Result<DateTime<Utc>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| {
            d.and_hms_opt(12, 0, 0)
                .expect("noon is valid on every calendar day")
                .and_utc()
        })
        .map_err(|_| ApiError::bad_request(&format!("Unparseable date: {}", raw)))
}

fn build_request(
    metric: &str,
    period_kind: &str,
    query: &LeaderboardQuery,
) -> Result<LeaderboardRequest, ApiError> {
    let scope = parse_scope(query.scope.as_deref())?;
    if scope.requires_geo_qualifier() && query.geo_code.is_none() {
        return Err(ApiError::bad_request(&format!(
            "scope {} requires geo_code",
            scope
        )));
    }
    Ok(LeaderboardRequest {
        metric: parse_metric(metric)?,
        period_kind: parse_period_kind(period_kind)?,
        reference: parse_reference_date(query.date.as_deref())?,
        scope,
        geo_qualifier: query.geo_code.clone(),
        force_refresh: query.force_refresh.unwrap_or(false),
    })
}

fn user_status(position: Option<SubjectPosition>) -> UserStatusDto {
    match position {
        Some(p) => UserStatusDto {
            in_leaderboard: true,
            rank: Some(p.rank),
            value: Some(p.value),
            total: Some(p.total),
            percentile: Some(p.percentile),
            change: Some(p.change),
        },
        None => UserStatusDto::absent(),
    }
}

/// Get a materialized leaderboard
#[utoipa::path(
    get,
    path = "/api/leaderboards/{metric}/{period_kind}",
    params(
        ("metric" = String, Path, description = "distance | activity-count | average-speed | peak-speed | duration | elevation"),
        ("period_kind" = String, Path, description = "daily | weekly | monthly | yearly | all-time"),
        ("date" = Option<String>, Query, description = "Reference date (ISO date or RFC 3339), defaults to now"),
        ("scope" = Option<String>, Query, description = "global | national | regional | city, defaults to global"),
        ("geo_code" = Option<String>, Query, description = "Geo qualifier, required for non-global scopes"),
        ("force_refresh" = Option<bool>, Query, description = "Force regeneration of the snapshot")
    ),
    responses(
        (status = 200, description = "The current snapshot for the requested key"),
        (status = 400, description = "Invalid metric, period kind, scope or date", body = ApiError),
        (status = 504, description = "Aggregation timed out and no previous snapshot exists", body = ApiError)
    ),
    tag = "leaderboards"
)]
#[get("/{metric}/{period_kind}")]
pub async fn get_leaderboard_handler(
    path: web::Path<(String, String)>,
    query: web::Query<LeaderboardQuery>,
    service: web::Data<LeaderboardService>,
    subject: Option<SubjectId>,
) -> Result<HttpResponse, ApiError> {
    let (metric, period_kind) = path.into_inner();
    let request = build_request(&metric, &period_kind, &query)?;
    let snapshot = service.get_or_generate(&request).await?;
    let status = match subject {
        Some(SubjectId(id)) => user_status(super::position::locate(&snapshot, &id)),
        None => UserStatusDto::absent(),
    };
    Ok(HttpResponse::Ok().json(LeaderboardResponseDto::from_snapshot(&snapshot, status)))
}

/// Get the calling subject's standing in a leaderboard
#[utoipa::path(
    get,
    path = "/api/leaderboards/{metric}/{period_kind}/position",
    params(
        ("metric" = String, Path, description = "Metric to rank by"),
        ("period_kind" = String, Path, description = "daily | weekly | monthly | yearly | all-time"),
        ("date" = Option<String>, Query, description = "Reference date, defaults to now"),
        ("scope" = Option<String>, Query, description = "Scope, defaults to global"),
        ("geo_code" = Option<String>, Query, description = "Geo qualifier, required for non-global scopes")
    ),
    responses(
        (status = 200, description = "The subject's rank, value, total and percentile"),
        (status = 400, description = "Invalid parameters or missing X-Subject-Id header", body = ApiError)
    ),
    tag = "leaderboards"
)]
#[get("/{metric}/{period_kind}/position")]
pub async fn get_position_handler(
    path: web::Path<(String, String)>,
    query: web::Query<LeaderboardQuery>,
    service: web::Data<LeaderboardService>,
    subject: SubjectId,
) -> Result<HttpResponse, ApiError> {
    let (metric, period_kind) = path.into_inner();
    let request = build_request(&metric, &period_kind, &query)?;
    let position = service.subject_position(&request, &subject.0).await?;
    Ok(HttpResponse::Ok().json(user_status(position)))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/leaderboards")
            .service(get_position_handler)
            .service(get_leaderboard_handler),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("distance", Metric::Distance)]
    #[test_case("activity-count", Metric::ActivityCount)]
    #[test_case("average-speed", Metric::AverageSpeed)]
    #[test_case("peak-speed", Metric::PeakSpeed)]
    fn metric_path_segments_parse(raw: &str, expected: Metric) {
        assert_eq!(parse_metric(raw).unwrap(), expected);
    }

    #[test]
    fn unknown_path_segments_are_rejected() {
        assert!(parse_metric("steps").is_err());
        assert_eq!(parse_period_kind("all-time").unwrap(), PeriodKind::AllTime);
        assert!(parse_period_kind("custom").is_err());
    }

    #[test]
    fn scope_defaults_to_global() {
        assert_eq!(parse_scope(None).unwrap(), Scope::Global);
        assert_eq!(parse_scope(Some("city")).unwrap(), Scope::City);
        assert!(parse_scope(Some("continental")).is_err());
    }

    #[test]
    fn reference_date_accepts_both_formats() {
        let from_date = parse_reference_date(Some("2024-05-15")).unwrap();
        assert_eq!(from_date.to_rfc3339(), "2024-05-15T12:00:00+00:00");

        let from_ts = parse_reference_date(Some("2024-05-15T08:30:00Z")).unwrap();
        assert_eq!(from_ts.to_rfc3339(), "2024-05-15T08:30:00+00:00");

        assert!(parse_reference_date(Some("May 15th")).is_err());
    }

    #[test]
    fn scoped_query_requires_geo_code() {
        let query = LeaderboardQuery {
            scope: Some("national".to_string()),
            ..LeaderboardQuery::default()
        };
        assert!(build_request("distance", "weekly", &query).is_err());

        let with_code = LeaderboardQuery {
            geo_code: Some("DE".to_string()),
            ..query
        };
        let request = build_request("distance", "weekly", &with_code).unwrap();
        assert_eq!(request.scope, Scope::National);
        assert_eq!(request.geo_qualifier.as_deref(), Some("DE"));
    }

    #[test]
    fn user_status_maps_position_fields() {
        let status = user_status(Some(SubjectPosition {
            rank: 10,
            value: 42.0,
            total: 100,
            percentile: 10,
            change: 2,
        }));
        assert!(status.in_leaderboard);
        assert_eq!(status.rank, Some(10));
        assert_eq!(status.percentile, Some(10));

        let absent = user_status(None);
        assert!(!absent.in_leaderboard);
        assert_eq!(absent.rank, None);
    }
}
