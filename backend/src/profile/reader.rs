use std::sync::Arc;
use std::time::Duration;

use arangors::client::ClientExt;
use arangors::{AqlQuery, Database};
use async_trait::async_trait;
use shared::{DisplayInfo, Result, SharedError};

use super::cache::ProfileCache;

/// Read-only access to athlete display metadata. Returns `None` for
/// deleted or unknown subjects; the enricher drops those entries.
#[async_trait]
pub trait ProfileReader: Send + Sync {
    async fn get_display_info(&self, subject_id: &str) -> Result<Option<DisplayInfo>>;
}

#[derive(Clone)]
pub struct ArangoProfileReader<C: ClientExt> {
    pub db: Database<C>,
}

impl<C: ClientExt> ArangoProfileReader<C> {
    pub fn new(db: Database<C>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<C: ClientExt + Send + Sync> ProfileReader for ArangoProfileReader<C> {
    async fn get_display_info(&self, subject_id: &str) -> Result<Option<DisplayInfo>> {
        let query = AqlQuery::builder()
            .query(
                r#"
                LET a = DOCUMENT(@subject_id)
                RETURN a == null ? null : {
                    display_name: a.display_name,
                    avatar_url: a.avatar_url
                }
            "#,
            )
            .bind_var("subject_id", subject_id)
            .build();
        let mut res = self
            .db
            .aql_query::<Option<DisplayInfo>>(query)
            .await
            .map_err(|e| SharedError::Database(format!("Failed to fetch athlete profile: {}", e)))?;
        Ok(res.pop().flatten())
    }
}

/// TTL-cached wrapper around any profile reader. Only hits are cached;
/// unknown subjects are re-checked on every regeneration so newly created
/// profiles appear without waiting out a negative-cache window.
pub struct CachedProfileReader {
    inner: Arc<dyn ProfileReader>,
    cache: ProfileCache,
}

impl CachedProfileReader {
    pub fn new(inner: Arc<dyn ProfileReader>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: ProfileCache::new(ttl),
        }
    }
}

#[async_trait]
impl ProfileReader for CachedProfileReader {
    async fn get_display_info(&self, subject_id: &str) -> Result<Option<DisplayInfo>> {
        if let Some(info) = self.cache.get(subject_id).await {
            return Ok(Some(info));
        }
        let resolved = self.inner.get_display_info(subject_id).await?;
        if let Some(info) = &resolved {
            self.cache.set(subject_id.to_string(), info.clone()).await;
        }
        Ok(resolved)
    }
}
