use super::*;

use sentra_core::TeamRoleId;
use sentra_domain::TeamRoleAssignment;

use crate::security_ports::DomainEvent;

impl SecurityAdminService {
    /// Assigns a role to a user in a team.
    pub async fn assign_role(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        input: AssignRoleInput,
    ) -> AppResult<TeamRoleAssignment> {
        self.require_admin(context, actor).await?;
        Self::ensure_authorable_overrides(&input.overrides)?;

        let role = self
            .repository
            .find_role(input.role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("role '{}' was not found", input.role_id))
            })?;
        self.hierarchy
            .team(input.team_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("team '{}' was not found", input.team_id))
            })?;

        if let Some(limit) = role.max_assignments_per_team() {
            let taken = self
                .repository
                .count_active_assignments_for_role_in_team(input.role_id, input.team_id)
                .await?;
            if taken >= u64::from(limit) {
                return Err(AppError::Conflict(format!(
                    "role '{}' already has {taken} of {limit} assignments in team '{}'",
                    role.name(),
                    input.team_id
                )));
            }
        }

        let mut assignment = TeamRoleAssignment::new(
            TeamRoleId::new(),
            input.user_id,
            input.team_id,
            input.role_id,
            input.hierarchy_mode,
        );
        assignment.set_overrides(input.overrides);
        self.repository.save_assignment(assignment.clone()).await?;

        self.invalidation
            .handle(&DomainEvent::RoleAssignmentChanged {
                user_ids: vec![input.user_id],
            })
            .await?;
        Ok(assignment)
    }

    /// Derives the child assignment a propagating ancestor assignment
    /// implies for one descendant team.
    pub async fn derive_assignment(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        parent_team_role_id: TeamRoleId,
        child_team_id: TeamId,
    ) -> AppResult<TeamRoleAssignment> {
        self.require_admin(context, actor).await?;

        let parent = self
            .repository
            .find_assignment(parent_team_role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "assignment '{parent_team_role_id}' was not found"
                ))
            })?;
        if !parent.is_active() {
            return Err(AppError::Conflict(format!(
                "assignment '{parent_team_role_id}' is no longer active"
            )));
        }
        if !parent.hierarchy_mode().grants_below() {
            return Err(AppError::Validation(format!(
                "assignment '{parent_team_role_id}' does not propagate to descendants"
            )));
        }
        if child_team_id == parent.team_id()
            || !self
                .hierarchy
                .is_descendant(parent.team_id(), child_team_id)
                .await?
        {
            return Err(AppError::Validation(format!(
                "team '{child_team_id}' is not a descendant of team '{}'",
                parent.team_id()
            )));
        }

        let derived = parent.derive_child(TeamRoleId::new(), child_team_id);
        self.repository.save_assignment(derived.clone()).await?;

        self.invalidation
            .handle(&DomainEvent::RoleAssignmentChanged {
                user_ids: vec![derived.user_id()],
            })
            .await?;
        Ok(derived)
    }

    /// Suspends an assignment.
    pub async fn suspend_assignment(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        team_role_id: TeamRoleId,
    ) -> AppResult<()> {
        self.require_admin(context, actor).await?;

        let mut assignment = self
            .repository
            .find_assignment(team_role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("assignment '{team_role_id}' was not found"))
            })?;
        assignment.suspend(Self::now());
        let user_id = assignment.user_id();
        self.repository.save_assignment(assignment).await?;

        self.invalidation
            .handle(&DomainEvent::RoleAssignmentChanged {
                user_ids: vec![user_id],
            })
            .await
    }

    /// Terminates an assignment, stamping it and soft-deleting it.
    pub async fn terminate_assignment(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        team_role_id: TeamRoleId,
    ) -> AppResult<()> {
        self.require_admin(context, actor).await?;

        let mut assignment = self
            .repository
            .find_assignment(team_role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("assignment '{team_role_id}' was not found"))
            })?;
        assignment.terminate(Self::now());
        let user_id = assignment.user_id();
        self.repository.save_assignment(assignment).await?;

        self.invalidation
            .handle(&DomainEvent::RoleAssignmentChanged {
                user_ids: vec![user_id],
            })
            .await
    }
}
