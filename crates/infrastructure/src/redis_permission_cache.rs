use async_trait::async_trait;
use redis::AsyncCommands;
use sentra_application::PermissionCache;
use sentra_core::{AppError, AppResult};
use serde_json::Value;

/// Redis implementation of the tag-addressable permission cache.
///
/// Entries are plain keys with TTLs; each tag is a set holding the keys it
/// covers, so bulk eviction never enumerates the key space. Safe for
/// concurrent access from independent worker processes: writes are
/// last-writer-wins and eviction is idempotent.
#[derive(Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}:tag:{tag}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }

    async fn delete_members(
        &self,
        connection: &mut redis::aio::MultiplexedConnection,
        members: &[String],
    ) -> AppResult<()> {
        if members.is_empty() {
            return Ok(());
        }

        let entry_keys: Vec<String> = members
            .iter()
            .map(|member| self.entry_key(member))
            .collect();
        let _: () = connection.del(entry_keys).await.map_err(|error| {
            AppError::Internal(format!("failed to evict cache entries: {error}"))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let mut connection = self.connection().await?;
        let encoded: Option<String> =
            connection.get(self.entry_key(key)).await.map_err(|error| {
                AppError::Internal(format!("failed to read cache entry: {error}"))
            })?;

        encoded
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|error| {
                    AppError::Internal(format!("invalid cache entry for '{key}': {error}"))
                })
            })
            .transpose()
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

        let encoded = serde_json::to_string(&value).map_err(|error| {
            AppError::Internal(format!("failed to encode cache entry for '{key}': {error}"))
        })?;

        let mut connection = self.connection().await?;
        let _: () = connection
            .set_ex(self.entry_key(key), encoded, u64::from(ttl_seconds))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write cache entry: {error}"))
            })?;

        for tag in tags {
            let _: () = connection
                .sadd(self.tag_key(tag), key)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to tag cache entry: {error}"))
                })?;
        }

        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let members: Vec<String> = connection
            .smembers(self.tag_key(tag))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read tag members: {error}"))
            })?;

        self.delete_members(&mut connection, &members).await?;
        let _: () = connection.del(self.tag_key(tag)).await.map_err(|error| {
            AppError::Internal(format!("failed to drop tag set: {error}"))
        })?;
        Ok(())
    }

    async fn invalidate_pattern(&self, tag: &str, pattern: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let members: Vec<String> = connection
            .smembers(self.tag_key(tag))
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read tag members: {error}"))
            })?;

        let matched: Vec<String> = members
            .into_iter()
            .filter(|member| crate::glob_match(pattern, member))
            .collect();
        if matched.is_empty() {
            return Ok(());
        }

        self.delete_members(&mut connection, &matched).await?;
        let _: () = connection
            .srem(self.tag_key(tag), &matched)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to untag cache entries: {error}"))
            })?;
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let match_pattern = format!("{}:*", self.key_prefix);
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(match_pattern.as_str())
                .arg("COUNT")
                .arg(250)
                .query_async(&mut connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to scan cache keys: {error}"))
                })?;

            if !keys.is_empty() {
                let _: () = connection.del(keys).await.map_err(|error| {
                    AppError::Internal(format!("failed to flush cache entries: {error}"))
                })?;
            }

            cursor = next;
            if cursor == 0 {
                return Ok(());
            }
        }
    }
}
