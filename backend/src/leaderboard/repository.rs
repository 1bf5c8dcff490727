use arangors::client::ClientExt;
use arangors::{AqlQuery, Database};
use async_trait::async_trait;
use serde_json::Value;
use shared::{LeaderboardSnapshot, Result, SharedError, SnapshotKey};

/// Persistence for materialized snapshots. One document per snapshot key;
/// `replace` swaps the whole entry set in a single upsert so readers only
/// ever observe a complete generation.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Latest snapshot for the key that is still marked valid.
    async fn find_valid(&self, key: &SnapshotKey) -> Result<Option<LeaderboardSnapshot>>;

    /// Latest snapshot for the key regardless of validity. Used as the
    /// delta baseline when regenerating.
    async fn find_latest(&self, key: &SnapshotKey) -> Result<Option<LeaderboardSnapshot>>;

    /// Atomically replaces the snapshot for the key with a freshly
    /// generated one.
    async fn replace(&self, snapshot: &LeaderboardSnapshot) -> Result<()>;
}

#[derive(Clone)]
pub struct SnapshotRepository<C: ClientExt> {
    pub db: Database<C>,
}

impl<C: ClientExt> SnapshotRepository<C> {
    pub fn new(db: Database<C>) -> Self {
        Self { db }
    }

    async fn find(
        &self,
        key: &SnapshotKey,
        valid_only: bool,
    ) -> Result<Option<LeaderboardSnapshot>> {
        let validity_filter = if valid_only {
            "AND s.is_valid == true"
        } else {
            ""
        };
        let aql = format!(
            r#"
                FOR s IN leaderboard_snapshot
                  FILTER s.metric == @metric
                    AND s.period_kind == @period_kind
                    AND s.period_id == @period_id
                    AND s.scope == @scope
                    AND ((@geo_qualifier == null AND s.geo_qualifier == null) OR s.geo_qualifier == @geo_qualifier)
                    {}
                  SORT s.updated_at DESC
                  RETURN UNSET(s, "_key", "_id", "_rev")
            "#,
            validity_filter
        );
        let query = AqlQuery::builder()
            .query(&aql)
            .bind_var("metric", key.metric.as_str())
            .bind_var("period_kind", key.period_kind.as_str())
            .bind_var("period_id", key.period_id.as_str())
            .bind_var("scope", key.scope.as_str())
            .bind_var("geo_qualifier", key.geo_qualifier.as_deref())
            .build();
        let mut res = self
            .db
            .aql_query::<LeaderboardSnapshot>(query)
            .await
            .map_err(|e| SharedError::Database(format!("Failed to fetch snapshot: {}", e)))?;
        if res.len() > 1 {
            log::error!(
                "Found {} snapshots for key {}, taking newest",
                res.len(),
                key.token()
            );
        }
        Ok(if res.is_empty() {
            None
        } else {
            Some(res.remove(0))
        })
    }
}

#[async_trait]
impl<C: ClientExt + Send + Sync> SnapshotStore for SnapshotRepository<C> {
    async fn find_valid(&self, key: &SnapshotKey) -> Result<Option<LeaderboardSnapshot>> {
        self.find(key, true).await
    }

    async fn find_latest(&self, key: &SnapshotKey) -> Result<Option<LeaderboardSnapshot>> {
        self.find(key, false).await
    }

    async fn replace(&self, snapshot: &LeaderboardSnapshot) -> Result<()> {
        let doc = serde_json::to_value(snapshot)
            .map_err(|e| SharedError::Conversion(format!("Failed to serialize snapshot: {}", e)))?;
        let query = AqlQuery::builder()
            .query(r#"
                UPSERT { metric: @doc.metric, period_kind: @doc.period_kind, period_id: @doc.period_id, scope: @doc.scope, geo_qualifier: @doc.geo_qualifier }
                INSERT @doc
                REPLACE @doc IN leaderboard_snapshot
            "#)
            .bind_var("doc", doc)
            .build();
        self.db
            .aql_query::<Value>(query)
            .await
            .map_err(|e| SharedError::Database(format!("Failed to replace snapshot: {}", e)))?;
        Ok(())
    }
}
