mod assignments;
mod roles;
mod teams;

use std::sync::Arc;

use chrono::Utc;
use sentra_core::{AppError, AppResult, RoleId, TeamId, UserId, UserIdentity};
use sentra_domain::{
    HierarchyMode, PermissionKey, PermissionOverride, PermissionType, RolePermission,
};

use crate::context::AccessContext;
use crate::security_ports::SecurityAdminRepository;
use crate::{CacheInvalidationManager, PermissionResolver, TeamHierarchyService};

/// Input payload for creating custom roles.
#[derive(Debug, Clone)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional per-team assignment limit.
    pub max_assignments_per_team: Option<u32>,
    /// Grants to attach to the role.
    pub permissions: Vec<RolePermission>,
}

/// Input payload for assigning a role to a user in a team.
#[derive(Debug, Clone)]
pub struct AssignRoleInput {
    /// User receiving the role.
    pub user_id: UserId,
    /// Team the assignment is attached to.
    pub team_id: TeamId,
    /// Role being assigned.
    pub role_id: RoleId,
    /// How the assignment radiates through the tree.
    pub hierarchy_mode: HierarchyMode,
    /// Direct overrides outranking the role's own grants.
    pub overrides: Vec<PermissionOverride>,
}

/// Administrative facade for the role, team and assignment lifecycle.
///
/// Every mutation requires the security administration permission and feeds
/// the invalidation manager so cached decisions never outlive the state they
/// were derived from.
#[derive(Clone)]
pub struct SecurityAdminService {
    repository: Arc<dyn SecurityAdminRepository>,
    hierarchy: TeamHierarchyService,
    resolver: PermissionResolver,
    invalidation: CacheInvalidationManager,
}

impl SecurityAdminService {
    /// Creates the admin service from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SecurityAdminRepository>,
        hierarchy: TeamHierarchyService,
        resolver: PermissionResolver,
        invalidation: CacheInvalidationManager,
    ) -> Self {
        Self {
            repository,
            hierarchy,
            resolver,
            invalidation,
        }
    }

    async fn require_admin(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
    ) -> AppResult<()> {
        self.resolver
            .require_permission(
                context,
                actor.user_id(),
                &Self::admin_key()?,
                PermissionType::All,
                None,
            )
            .await
    }

    fn admin_key() -> AppResult<PermissionKey> {
        PermissionKey::new("Security")
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    fn ensure_authorable(grants: &[RolePermission]) -> AppResult<()> {
        for grant in grants {
            if !PermissionType::authorable().contains(&grant.permission_type) {
                return Err(AppError::Validation(format!(
                    "permission type '{}' cannot be granted directly",
                    grant.permission_type.as_str()
                )));
            }
        }
        Ok(())
    }

    fn ensure_authorable_overrides(overrides: &[PermissionOverride]) -> AppResult<()> {
        for entry in overrides {
            if !PermissionType::authorable().contains(&entry.permission_type) {
                return Err(AppError::Validation(format!(
                    "permission type '{}' cannot be granted directly",
                    entry.permission_type.as_str()
                )));
            }
        }
        Ok(())
    }
}
