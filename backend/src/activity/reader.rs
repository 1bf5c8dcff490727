use arangors::client::ClientExt;
use arangors::{AqlQuery, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ActivityRecord, Result, Scope, SharedError};

/// Read-only access to raw track documents. The aggregation strategies are
/// the only consumers; they never mutate activity data.
#[async_trait]
pub trait ActivityReader: Send + Sync {
    /// Returns all tracks that started within `[start, end]` and match the
    /// geo scope. Non-global scopes filter on the track's geo tag; tracks
    /// without a tag never match a non-global scope.
    async fn query_activities(
        &self,
        scope: Scope,
        geo_qualifier: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;
}

#[derive(Clone)]
pub struct ArangoActivityReader<C: ClientExt> {
    pub db: Database<C>,
}

impl<C: ClientExt> ArangoActivityReader<C> {
    pub fn new(db: Database<C>) -> Self {
        Self { db }
    }

    fn geo_filter(scope: Scope) -> &'static str {
        match scope {
            Scope::Global => "",
            Scope::National => "FILTER t.geo != null AND t.geo.country == @geo",
            Scope::Regional => "FILTER t.geo != null AND t.geo.region == @geo",
            Scope::City => "FILTER t.geo != null AND t.geo.city == @geo",
        }
    }
}

#[async_trait]
impl<C: ClientExt + Send + Sync> ActivityReader for ArangoActivityReader<C> {
    async fn query_activities(
        &self,
        scope: Scope,
        geo_qualifier: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let query_text = format!(
            r#"
            FOR t IN track
              FILTER t.started_at >= @start AND t.started_at <= @end
              {}
              RETURN {{
                subject_id: t.subject_id,
                started_at: t.started_at,
                distance_m: t.distance_m,
                duration_s: t.duration_s,
                elevation_gain_m: t.elevation_gain_m,
                max_speed_kmh: t.max_speed_kmh,
                geo: t.geo
              }}
        "#,
            Self::geo_filter(scope)
        );

        let mut builder = AqlQuery::builder()
            .query(&query_text)
            .bind_var("start", start.to_rfc3339())
            .bind_var("end", end.to_rfc3339());
        if scope.requires_geo_qualifier() {
            builder = builder.bind_var("geo", geo_qualifier.unwrap_or_default());
        }

        let records = self
            .db
            .aql_query::<ActivityRecord>(builder.build())
            .await
            .map_err(|e| SharedError::Database(format!("Failed to query tracks: {}", e)))?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn global_scope_adds_no_geo_filter() {
        assert_eq!(
            ArangoActivityReader::<arangors::client::reqwest::ReqwestClient>::geo_filter(
                Scope::Global
            ),
            ""
        );
    }

    #[test]
    fn scoped_queries_require_a_geo_tag() {
        for scope in [Scope::National, Scope::Regional, Scope::City] {
            let filter =
                ArangoActivityReader::<arangors::client::reqwest::ReqwestClient>::geo_filter(scope);
            assert!(filter.contains("t.geo != null"));
        }
    }
}
