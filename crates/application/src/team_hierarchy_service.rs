use std::sync::Arc;

use sentra_core::{AppResult, RoleId, TeamId, short_hash};
use sentra_domain::Team;
use serde::Serialize;
use serde_json::Value;

use crate::SecurityConfig;
use crate::security_ports::{PermissionCache, TREE_TAG, TeamRepository, TeamWithRole};

/// Read service over the live team tree.
///
/// Traversals are bounded by the configured depth cap and cached under the
/// tree tag so any hierarchy mutation can evict them in bulk. An unknown
/// team id yields empty results, never an error.
#[derive(Clone)]
pub struct TeamHierarchyService {
    repository: Arc<dyn TeamRepository>,
    cache: Arc<dyn PermissionCache>,
    config: SecurityConfig,
}

impl TeamHierarchyService {
    /// Creates a hierarchy service from a repository and cache.
    #[must_use]
    pub fn new(
        repository: Arc<dyn TeamRepository>,
        cache: Arc<dyn PermissionCache>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            config,
        }
    }

    /// Looks up one live team.
    pub async fn team(&self, team_id: TeamId) -> AppResult<Option<Team>> {
        self.repository.find_team(team_id).await
    }

    /// Lists descendant teams, optionally depth-bounded and name-filtered.
    pub async fn descendants(
        &self,
        team_id: TeamId,
        max_depth: Option<u32>,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        let depth = self.config.effective_depth(max_depth);
        let cache_key = format!(
            "authz:tree:descendants:{team_id}:{depth}:{}",
            short_hash(search.unwrap_or_default())
        );

        if let Some(cached) = self.cached(&cache_key).await {
            return Ok(cached);
        }

        let teams = self
            .repository
            .list_descendants(team_id, depth, search)
            .await?;
        self.store(&cache_key, &teams).await;
        Ok(teams)
    }

    /// Lists ancestor teams, nearest parent first.
    pub async fn ancestors(&self, team_id: TeamId) -> AppResult<Vec<Team>> {
        let cache_key = format!("authz:tree:ancestors:{team_id}");

        if let Some(cached) = self.cached(&cache_key).await {
            return Ok(cached);
        }

        let teams = self
            .repository
            .list_ancestors(team_id, self.config.max_hierarchy_depth)
            .await?;
        self.store(&cache_key, &teams).await;
        Ok(teams)
    }

    /// Lists teams sharing the same parent, the team itself excluded.
    pub async fn siblings(&self, team_id: TeamId, search: Option<&str>) -> AppResult<Vec<Team>> {
        let cache_key = format!(
            "authz:tree:siblings:{team_id}:{}",
            short_hash(search.unwrap_or_default())
        );

        if let Some(cached) = self.cached(&cache_key).await {
            return Ok(cached);
        }

        let teams = self.repository.list_siblings(team_id, search).await?;
        self.store(&cache_key, &teams).await;
        Ok(teams)
    }

    /// Returns whether a team is the ancestor itself or one of its
    /// transitive children.
    pub async fn is_descendant(
        &self,
        ancestor_id: TeamId,
        candidate_id: TeamId,
    ) -> AppResult<bool> {
        if ancestor_id == candidate_id {
            return Ok(true);
        }

        let ancestors = self.ancestors(candidate_id).await?;
        Ok(ancestors
            .iter()
            .any(|team| team.team_id() == ancestor_id))
    }

    /// Lists descendant teams joined with the assignment a role already has
    /// in each of them.
    pub async fn descendants_with_role(
        &self,
        team_id: TeamId,
        role_id: RoleId,
    ) -> AppResult<Vec<TeamWithRole>> {
        let cache_key = format!("authz:tree:role:{team_id}:{role_id}");

        if let Some(value) = self.cache_get(&cache_key).await {
            if let Ok(decoded) = serde_json::from_value::<Vec<TeamWithRole>>(value) {
                return Ok(decoded);
            }
        }

        let teams = self
            .repository
            .list_descendants_with_role(team_id, role_id, self.config.max_hierarchy_depth)
            .await?;
        self.cache_put(&cache_key, &teams).await;
        Ok(teams)
    }

    async fn cached(&self, cache_key: &str) -> Option<Vec<Team>> {
        let value = self.cache_get(cache_key).await?;
        serde_json::from_value(value).ok()
    }

    async fn store(&self, cache_key: &str, teams: &[Team]) {
        self.cache_put(cache_key, teams).await;
    }

    async fn cache_get(&self, cache_key: &str) -> Option<Value> {
        match self.cache.get(cache_key).await {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(cache_key, %error, "tree cache read failed, recomputing");
                None
            }
        }
    }

    async fn cache_put<T: Serialize + ?Sized>(&self, cache_key: &str, value: &T) {
        let Ok(encoded) = serde_json::to_value(value) else {
            return;
        };

        if let Err(error) = self
            .cache
            .put(
                cache_key,
                encoded,
                self.config.hierarchy_ttl_seconds,
                &[TREE_TAG.to_owned()],
            )
            .await
        {
            tracing::debug!(cache_key, %error, "tree cache write failed");
        }
    }
}
