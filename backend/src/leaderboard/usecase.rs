use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use shared::{
    LeaderboardSnapshot, Metric, PeriodKind, Result, Scope, SharedError, SnapshotKey,
};
use tokio::sync::Mutex;

use crate::activity::reader::ActivityReader;
use crate::metrics::Metrics;
use crate::profile::reader::ProfileReader;

use super::aggregate::AggregatorRegistry;
use super::delta;
use super::enrich::EntryEnricher;
use super::period;
use super::position::{self, SubjectPosition};
use super::repository::SnapshotStore;

/// One leaderboard request, fully parsed and validated.
#[derive(Debug, Clone)]
pub struct LeaderboardRequest {
    pub metric: Metric,
    pub period_kind: PeriodKind,
    pub reference: DateTime<Utc>,
    pub scope: Scope,
    pub geo_qualifier: Option<String>,
    pub force_refresh: bool,
}

/// Orchestrates snapshot lookup and regeneration. Regenerations for the
/// same key are serialized through a per-key mutex so concurrent readers
/// of a cold key trigger one aggregation, not N.
pub struct LeaderboardService {
    store: Arc<dyn SnapshotStore>,
    activities: Arc<dyn ActivityReader>,
    enricher: EntryEnricher,
    aggregators: AggregatorRegistry,
    entry_limit: usize,
    aggregation_timeout: Duration,
    // Grows with the number of distinct keys ever requested, which is
    // bounded by metric x period x scope cardinality.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LeaderboardService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        activities: Arc<dyn ActivityReader>,
        profiles: Arc<dyn ProfileReader>,
        aggregators: AggregatorRegistry,
        entry_limit: usize,
        aggregation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            activities,
            enricher: EntryEnricher::new(profiles),
            aggregators,
            entry_limit,
            aggregation_timeout,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current snapshot for the request, regenerating it when
    /// there is no reusable one. Daily periods are still accumulating data
    /// and always regenerate on read; other kinds reuse a valid snapshot
    /// unless `force_refresh` is set.
    pub async fn get_or_generate(&self, req: &LeaderboardRequest) -> Result<LeaderboardSnapshot> {
        let key = self.resolve_key(req)?;
        let must_regenerate = req.force_refresh || req.period_kind == PeriodKind::Daily;

        if !must_regenerate {
            if let Some(snapshot) = self.store.find_valid(&key).await? {
                if let Some(metrics) = Metrics::global() {
                    metrics.observe_snapshot_reuse(key.metric.as_str(), key.period_kind.as_str());
                }
                return Ok(snapshot);
            }
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        // Another request may have finished the same regeneration while
        // we waited on the key lock.
        if !must_regenerate {
            if let Some(snapshot) = self.store.find_valid(&key).await? {
                return Ok(snapshot);
            }
        }

        match self.regenerate(req, &key).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_retryable() => {
                // Last-known-good: the previous snapshot was never touched,
                // so serve it stale rather than failing the read.
                log::warn!("Regeneration failed for {}: {}", key.token(), e);
                match self.store.find_valid(&key).await? {
                    Some(snapshot) => Ok(snapshot),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves a subject's standing in the requested leaderboard. Reads
    /// through `get_or_generate`, so a cold key is materialized first.
    pub async fn subject_position(
        &self,
        req: &LeaderboardRequest,
        subject_id: &str,
    ) -> Result<Option<SubjectPosition>> {
        let snapshot = self.get_or_generate(req).await?;
        Ok(position::locate(&snapshot, subject_id))
    }

    fn resolve_key(&self, req: &LeaderboardRequest) -> Result<SnapshotKey> {
        if req.scope.requires_geo_qualifier() && req.geo_qualifier.is_none() {
            return Err(SharedError::BadRequest(format!(
                "scope {} requires a geo qualifier",
                req.scope
            )));
        }
        let resolved = period::resolve(req.period_kind, req.reference)?;
        Ok(SnapshotKey {
            metric: req.metric,
            period_kind: req.period_kind,
            period_id: resolved.period_id,
            scope: req.scope,
            // A qualifier on a global request is meaningless; drop it so
            // it cannot split the key space.
            geo_qualifier: if req.scope == Scope::Global {
                None
            } else {
                req.geo_qualifier.clone()
            },
        })
    }

    async fn key_lock(&self, key: &SnapshotKey) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight.entry(key.token()).or_default().clone()
    }

    /// aggregation -> enrichment -> delta -> persist, strictly in that
    /// order: the delta baseline must be read before the replacement is
    /// written. Caller holds the key lock.
    async fn regenerate(
        &self,
        req: &LeaderboardRequest,
        key: &SnapshotKey,
    ) -> Result<LeaderboardSnapshot> {
        let started = Instant::now();
        let result = self.regenerate_inner(req, key).await;
        if let Some(metrics) = Metrics::global() {
            let outcome = if result.is_ok() { "success" } else { "failure" };
            metrics.observe_regeneration(
                key.metric.as_str(),
                key.period_kind.as_str(),
                outcome,
                started.elapsed(),
            );
        }
        result
    }

    async fn regenerate_inner(
        &self,
        req: &LeaderboardRequest,
        key: &SnapshotKey,
    ) -> Result<LeaderboardSnapshot> {
        let resolved = period::resolve(req.period_kind, req.reference)?;

        let ranked = tokio::time::timeout(
            self.aggregation_timeout,
            self.aggregators.aggregate(
                self.activities.as_ref(),
                key.metric,
                resolved.start,
                resolved.end,
                key.scope,
                key.geo_qualifier.as_deref(),
                self.entry_limit,
            ),
        )
        .await
        .map_err(|_| {
            SharedError::Timeout(format!(
                "aggregation exceeded {}s for {}",
                self.aggregation_timeout.as_secs(),
                key.token()
            ))
        })??;

        let mut entries = self.enricher.enrich(ranked).await?;

        let previous = self.store.find_latest(key).await?;
        delta::annotate(
            &mut entries,
            previous.as_ref().map(|s| s.entries.as_slice()),
        );

        let snapshot = LeaderboardSnapshot {
            metric: key.metric,
            period_kind: key.period_kind,
            period_id: key.period_id.clone(),
            start_date: resolved.start,
            end_date: resolved.end,
            scope: key.scope,
            geo_qualifier: key.geo_qualifier.clone(),
            entries,
            is_valid: true,
            updated_at: Utc::now(),
        };
        self.store.replace(&snapshot).await?;
        log::info!(
            "Materialized {} with {} entries",
            key.token(),
            snapshot.entries.len()
        );
        Ok(snapshot)
    }
}
