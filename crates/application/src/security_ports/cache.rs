use async_trait::async_trait;
use sentra_core::{AppResult, TeamId, TeamRoleId, UserId, short_hash};
use sentra_domain::PermissionKey;
use serde_json::Value;

/// Tag grouping every cached permission decision.
pub const DECISIONS_TAG: &str = "authz:decisions";

/// Tag grouping every cached tree traversal.
pub const TREE_TAG: &str = "authz:tree";

/// Returns the invalidation tag covering one user's cached decisions.
#[must_use]
pub fn user_cache_tag(user_id: UserId) -> String {
    format!("authz:user:{user_id}")
}

/// Returns the cache key for one resolution decision.
#[must_use]
pub fn decision_cache_key(
    user_id: UserId,
    key: &PermissionKey,
    required: &str,
    team_scope: Option<TeamId>,
) -> String {
    let scope = team_scope.map_or_else(|| "global".to_owned(), |team_id| team_id.to_string());
    format!(
        "authz:decision:{user_id}:{}:{required}:{scope}",
        short_hash(key.as_str())
    )
}

/// Returns the cache key for one assignment's granted-team set.
#[must_use]
pub fn granted_teams_cache_key(team_role_id: TeamRoleId) -> String {
    format!("authz:grants:{team_role_id}")
}

/// Tag-addressable cache port shared by every service.
///
/// Contents are advisory: every caller recomputes on a miss, and adapter
/// failures must degrade to a miss rather than an error wherever a direct
/// computation exists. Writes are last-writer-wins per key; bulk eviction
/// happens through tags, never by key enumeration.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    /// Returns a cached value for one key.
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;

    /// Stores a value under tags with a ttl. A zero ttl skips the write.
    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()>;

    /// Evicts every key carrying a tag.
    async fn invalidate_tag(&self, tag: &str) -> AppResult<()>;

    /// Evicts keys carrying a tag whose name matches a glob pattern.
    async fn invalidate_pattern(&self, tag: &str, pattern: &str) -> AppResult<()>;

    /// Evicts everything this cache owns.
    async fn flush(&self) -> AppResult<()>;
}
