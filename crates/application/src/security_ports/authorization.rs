use async_trait::async_trait;
use sentra_core::{AppResult, RoleId, TeamId, UserId};
use sentra_domain::{PermissionDefinition, PermissionKey, RolePermission, TeamRoleAssignment};

/// Repository port for permission resolution lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists a user's active team-role assignments with their direct
    /// overrides, optionally narrowed to a set of teams. Suspended,
    /// terminated and soft-deleted assignments are excluded.
    async fn list_active_assignments(
        &self,
        user_id: UserId,
        team_filter: Option<&[TeamId]>,
    ) -> AppResult<Vec<TeamRoleAssignment>>;

    /// Lists permission grants for a set of roles in one pass.
    async fn list_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, RolePermission)>>;

    /// Looks up a registered permission definition by key.
    async fn find_permission(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>>;
}
