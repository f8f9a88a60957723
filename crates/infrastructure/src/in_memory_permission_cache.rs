use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sentra_application::PermissionCache;
use sentra_core::AppResult;
use serde_json::Value;
use tokio::sync::RwLock;

struct CacheEntry {
    value: Value,
    tags: Vec<String>,
    expires_at: Instant,
}

/// In-memory implementation of the permission cache port.
///
/// Honors TTLs and tag eviction deterministically; also the fallback tier
/// when no external cache is configured.
#[derive(Default)]
pub struct InMemoryPermissionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryPermissionCache {
    /// Creates an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Returns whether the cache has no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PermissionCache for InMemoryPermissionCache {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        self.entries.write().await.insert(
            key.to_owned(),
            CacheEntry {
                value,
                tags: tags.to_vec(),
                expires_at: Instant::now() + Duration::from_secs(u64::from(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> AppResult<()> {
        self.entries
            .write()
            .await
            .retain(|_, entry| !entry.tags.iter().any(|candidate| candidate == tag));
        Ok(())
    }

    async fn invalidate_pattern(&self, tag: &str, pattern: &str) -> AppResult<()> {
        self.entries.write().await.retain(|key, entry| {
            !(entry.tags.iter().any(|candidate| candidate == tag)
                && crate::glob_match(pattern, key))
        });
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
