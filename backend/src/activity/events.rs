use arangors::client::ClientExt;
use arangors::{AqlQuery, Database};
use async_trait::async_trait;
use serde_json::Value;
use shared::{ActivityRecord, Result, SharedError};

/// Domain event raised after a track document has been stored. Handlers
/// run outside the track write path; a handler failure never rolls back
/// the stored track.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecorded {
    pub record: ActivityRecord,
}

#[async_trait]
pub trait ActivityEventHandler: Send + Sync {
    async fn on_activity_recorded(&self, event: &ActivityRecorded) -> Result<()>;
}

/// Folds recorded tracks into the denormalized `athlete_stats` document.
/// The upsert increments totals in one statement so concurrent events for
/// the same athlete never lose an update.
#[derive(Clone)]
pub struct StatsHandler<C: ClientExt> {
    pub db: Database<C>,
}

impl<C: ClientExt> StatsHandler<C> {
    pub fn new(db: Database<C>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<C: ClientExt + Send + Sync> ActivityEventHandler for StatsHandler<C> {
    async fn on_activity_recorded(&self, event: &ActivityRecorded) -> Result<()> {
        let record = &event.record;
        let query = AqlQuery::builder()
            .query(
                r#"
                UPSERT { subject_id: @subject_id }
                INSERT {
                    subject_id: @subject_id,
                    activity_count: 1,
                    total_distance_m: @distance_m,
                    total_duration_s: @duration_s,
                    total_elevation_m: @elevation_m,
                    last_activity_at: @started_at
                }
                UPDATE {
                    activity_count: OLD.activity_count + 1,
                    total_distance_m: OLD.total_distance_m + @distance_m,
                    total_duration_s: OLD.total_duration_s + @duration_s,
                    total_elevation_m: OLD.total_elevation_m + @elevation_m,
                    last_activity_at: OLD.last_activity_at > @started_at
                        ? OLD.last_activity_at
                        : @started_at
                } IN athlete_stats
            "#,
            )
            .bind_var("subject_id", record.subject_id.as_str())
            .bind_var("distance_m", record.distance_m)
            .bind_var("duration_s", record.duration_s)
            .bind_var("elevation_m", record.elevation_gain_m)
            .bind_var("started_at", record.started_at.to_rfc3339())
            .build();
        self.db
            .aql_query::<Value>(query)
            .await
            .map_err(|e| SharedError::Database(format!("Failed to update athlete stats: {}", e)))?;
        log::debug!("Applied activity-recorded event for {}", record.subject_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use shared::AthleteStats;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// In-memory handler mirroring the AQL fold, used to pin down the
    /// event semantics without a database.
    struct InMemoryStatsHandler {
        stats: Arc<Mutex<AthleteStats>>,
    }

    #[async_trait]
    impl ActivityEventHandler for InMemoryStatsHandler {
        async fn on_activity_recorded(&self, event: &ActivityRecorded) -> Result<()> {
            self.stats.lock().await.apply(&event.record);
            Ok(())
        }
    }

    fn record(day: u32, distance_m: f64) -> ActivityRecord {
        ActivityRecord {
            subject_id: "athlete/a1".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap(),
            distance_m,
            duration_s: 1_800.0,
            elevation_gain_m: 25.0,
            max_speed_kmh: 31.0,
            geo: None,
        }
    }

    #[tokio::test]
    async fn events_fold_into_running_totals() {
        let stats = Arc::new(Mutex::new(AthleteStats::new("athlete/a1".to_string())));
        let handler = InMemoryStatsHandler { stats: stats.clone() };

        handler
            .on_activity_recorded(&ActivityRecorded { record: record(2, 8_000.0) })
            .await
            .unwrap();
        handler
            .on_activity_recorded(&ActivityRecorded { record: record(1, 5_000.0) })
            .await
            .unwrap();

        let stats = stats.lock().await;
        assert_eq!(stats.activity_count, 2);
        assert_eq!(stats.total_distance_m, 13_000.0);
        // Out-of-order delivery must not move last_activity_at backwards.
        assert_eq!(
            stats.last_activity_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 7, 0, 0).unwrap())
        );
    }
}
