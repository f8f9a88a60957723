use async_trait::async_trait;
use sentra_core::{AppResult, RoleId, TeamId, TeamRoleId};
use sentra_domain::{RoleDefinition, RolePermission, Team, TeamRoleAssignment};

/// Repository port for role, team and assignment lifecycle mutations.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Looks up a role definition by id.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>>;

    /// Persists a new role definition.
    async fn save_role(&self, role: RoleDefinition) -> AppResult<()>;

    /// Replaces the permission grants of a role.
    async fn update_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<RolePermission>,
    ) -> AppResult<()>;

    /// Permanently removes a role definition. Does not cascade.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Counts active assignments that still reference a role.
    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64>;

    /// Counts active assignments for a role inside one team.
    async fn count_active_assignments_for_role_in_team(
        &self,
        role_id: RoleId,
        team_id: TeamId,
    ) -> AppResult<u64>;

    /// Looks up an assignment by id, including inactive rows.
    async fn find_assignment(
        &self,
        team_role_id: TeamRoleId,
    ) -> AppResult<Option<TeamRoleAssignment>>;

    /// Persists an assignment, inserting or replacing by id.
    async fn save_assignment(&self, assignment: TeamRoleAssignment) -> AppResult<()>;

    /// Persists a team, inserting or replacing by id.
    async fn save_team(&self, team: Team) -> AppResult<()>;
}
