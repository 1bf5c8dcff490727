use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shared::DisplayInfo;
use tokio::sync::RwLock;

#[derive(Clone)]
struct CacheEntry {
    info: DisplayInfo,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(info: DisplayInfo, ttl: Duration) -> Self {
        Self {
            info,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// In-memory cache for athlete display info, fronting the profile store
/// during enrichment so a regeneration does one lookup per subject at
/// most once per TTL window.
#[derive(Clone)]
pub struct ProfileCache {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// 10 minute default TTL.
    pub fn new_default() -> Self {
        Self::new(Duration::from_secs(600))
    }

    pub async fn get(&self, subject_id: &str) -> Option<DisplayInfo> {
        let cache = self.cache.read().await;
        cache
            .get(subject_id)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.info.clone())
    }

    pub async fn set(&self, subject_id: String, info: DisplayInfo) {
        let entry = CacheEntry::new(info, self.ttl);
        let mut cache = self.cache.write().await;
        cache.insert(subject_id, entry);
    }

    pub async fn remove(&self, subject_id: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(subject_id);
    }

    /// Drops all expired entries.
    pub async fn cleanup(&self) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| !entry.is_expired());
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(name: &str) -> DisplayInfo {
        DisplayInfo {
            display_name: name.to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn basic_set_and_get() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.set("athlete/a1".to_string(), info("Alda")).await;
        assert_eq!(cache.get("athlete/a1").await, Some(info("Alda")));
        assert_eq!(cache.get("athlete/missing").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let cache = ProfileCache::new(Duration::from_millis(30));
        cache.set("athlete/a1".to_string(), info("Alda")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("athlete/a1").await, None);
    }

    #[tokio::test]
    async fn cleanup_evicts_expired_entries() {
        let cache = ProfileCache::new(Duration::from_millis(30));
        cache.set("athlete/a1".to_string(), info("Alda")).await;
        cache.set("athlete/a2".to_string(), info("Bram")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.cleanup().await;
        assert_eq!(cache.len().await, 0);
    }
}
