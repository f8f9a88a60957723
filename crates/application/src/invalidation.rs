use std::sync::Arc;

use sentra_core::{AppResult, UserId, short_hash};

use crate::security_ports::{
    DECISIONS_TAG, DomainEvent, PermissionCache, TREE_TAG, user_cache_tag,
};

/// Maps domain mutation events onto cache tag and pattern evictions.
///
/// Role-permission changes cannot name the affected users, so they evict the
/// whole decision family; hierarchy changes additionally evict decisions
/// because scope expansion derives from the tree.
#[derive(Clone)]
pub struct CacheInvalidationManager {
    cache: Arc<dyn PermissionCache>,
}

impl CacheInvalidationManager {
    /// Creates an invalidation manager over the shared cache.
    #[must_use]
    pub fn new(cache: Arc<dyn PermissionCache>) -> Self {
        Self { cache }
    }

    /// Applies the evictions a domain event requires.
    pub async fn handle(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::RoleAssignmentChanged { user_ids } => {
                for user_id in user_ids {
                    self.cache
                        .invalidate_tag(user_cache_tag(*user_id).as_str())
                        .await?;
                }
                Ok(())
            }
            DomainEvent::RolePermissionsChanged { role_ids: _ } => {
                self.cache.invalidate_tag(DECISIONS_TAG).await
            }
            DomainEvent::TeamHierarchyChanged { team_ids: _ }
            | DomainEvent::TeamCreated { team_ids: _ } => {
                self.cache.invalidate_tag(TREE_TAG).await?;
                self.cache.invalidate_tag(DECISIONS_TAG).await
            }
            DomainEvent::PermissionDefinitionChanged { permission_keys } => {
                for key in permission_keys {
                    let pattern = format!("*:{}:*", short_hash(key.as_str()));
                    self.cache
                        .invalidate_pattern(DECISIONS_TAG, pattern.as_str())
                        .await?;
                }
                Ok(())
            }
        }
    }

    /// Evicts every cached decision for one user.
    pub async fn clear_user_cache(&self, user_id: UserId) -> AppResult<()> {
        self.cache
            .invalidate_tag(user_cache_tag(user_id).as_str())
            .await
    }

    /// Evicts everything the engine has cached.
    pub async fn clear_all_cache(&self) -> AppResult<()> {
        self.cache.flush().await
    }
}
