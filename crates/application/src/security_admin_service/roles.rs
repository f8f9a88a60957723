use super::*;

use sentra_domain::RoleDefinition;

use crate::security_ports::DomainEvent;

impl SecurityAdminService {
    /// Creates a custom role.
    ///
    /// Grants must use authorable permission types; `write` is reachable
    /// only as an implied value.
    pub async fn create_role(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<RoleDefinition> {
        self.require_admin(context, actor).await?;
        Self::ensure_authorable(&input.permissions)?;

        let role = RoleDefinition::new(
            RoleId::new(),
            input.name,
            false,
            input.max_assignments_per_team,
            input.permissions,
        )?;
        self.repository.save_role(role.clone()).await?;
        Ok(role)
    }

    /// Replaces the permission grants of a user-defined role.
    pub async fn update_role_permissions(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        role_id: RoleId,
        permissions: Vec<RolePermission>,
    ) -> AppResult<()> {
        self.require_admin(context, actor).await?;
        Self::ensure_authorable(&permissions)?;

        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        if role.is_from_system() {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be modified",
                role.name()
            )));
        }

        self.repository
            .update_role_permissions(role_id, permissions)
            .await?;
        self.invalidation
            .handle(&DomainEvent::RolePermissionsChanged {
                role_ids: vec![role_id],
            })
            .await
    }

    /// Permanently removes a role.
    ///
    /// Refused for system roles and for roles that still have assignments;
    /// the delete never cascades.
    pub async fn delete_role(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require_admin(context, actor).await?;

        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        if role.is_from_system() {
            return Err(AppError::Conflict(format!(
                "system role '{}' cannot be deleted",
                role.name()
            )));
        }

        let remaining = self
            .repository
            .count_active_assignments_for_role(role_id)
            .await?;
        if remaining > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' still has {remaining} active assignments",
                role.name()
            )));
        }

        self.repository.delete_role(role_id).await?;
        self.invalidation
            .handle(&DomainEvent::RolePermissionsChanged {
                role_ids: vec![role_id],
            })
            .await
    }
}
