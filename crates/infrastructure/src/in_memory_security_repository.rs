use std::collections::HashMap;

use async_trait::async_trait;
use sentra_application::{
    AuthorizationRepository, SecurityAdminRepository, TeamRepository, TeamWithRole,
};
use sentra_core::{AppError, AppResult, RoleId, TeamId, TeamRoleId, UserId};
use sentra_domain::{
    PermissionDefinition, PermissionKey, RoleDefinition, RolePermission, Team,
    TeamRoleAssignment,
};
use tokio::sync::RwLock;

/// In-memory backing store implementing every repository port.
///
/// One instance plays the role of the shared database: teams, roles,
/// permissions and assignments live in the same maps so traversal joins see
/// the same state the resolver reads.
#[derive(Debug, Default)]
pub struct InMemorySecurityRepository {
    permissions: RwLock<HashMap<String, PermissionDefinition>>,
    roles: RwLock<HashMap<RoleId, RoleDefinition>>,
    teams: RwLock<HashMap<TeamId, Team>>,
    assignments: RwLock<HashMap<TeamRoleId, TeamRoleAssignment>>,
}

impl InMemorySecurityRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a permission definition.
    pub async fn insert_permission(&self, definition: PermissionDefinition) {
        self.permissions
            .write()
            .await
            .insert(definition.key().as_str().to_owned(), definition);
    }

    /// Seeds a team.
    pub async fn insert_team(&self, team: Team) {
        self.teams.write().await.insert(team.team_id(), team);
    }

    /// Seeds a role definition.
    pub async fn insert_role(&self, role: RoleDefinition) {
        self.roles.write().await.insert(role.role_id(), role);
    }

    /// Seeds an assignment.
    pub async fn insert_assignment(&self, assignment: TeamRoleAssignment) {
        self.assignments
            .write()
            .await
            .insert(assignment.team_role_id(), assignment);
    }

    async fn live_teams(&self) -> Vec<Team> {
        self.teams
            .read()
            .await
            .values()
            .filter(|team| !team.is_deleted())
            .cloned()
            .collect()
    }

    async fn collect_descendants(&self, team_id: TeamId, max_depth: u32) -> Vec<Team> {
        let teams = self.live_teams().await;
        let mut frontier = vec![team_id];
        let mut found = Vec::new();

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for team in &teams {
                if team
                    .parent_team_id()
                    .is_some_and(|parent| frontier.contains(&parent))
                {
                    next.push(team.team_id());
                    found.push(team.clone());
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        found.sort_by(|left, right| left.name().cmp(right.name()));
        found
    }
}

fn matches_search(team: &Team, search: Option<&str>) -> bool {
    search.is_none_or(|fragment| {
        team.name()
            .to_lowercase()
            .contains(fragment.to_lowercase().as_str())
    })
}

#[async_trait]
impl AuthorizationRepository for InMemorySecurityRepository {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
        team_filter: Option<&[TeamId]>,
    ) -> AppResult<Vec<TeamRoleAssignment>> {
        let mut listed: Vec<TeamRoleAssignment> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|assignment| {
                assignment.user_id() == user_id
                    && assignment.is_active()
                    && team_filter.is_none_or(|teams| teams.contains(&assignment.team_id()))
            })
            .cloned()
            .collect();
        listed.sort_by_key(TeamRoleAssignment::team_role_id);
        Ok(listed)
    }

    async fn list_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, RolePermission)>> {
        let roles = self.roles.read().await;
        Ok(role_ids
            .iter()
            .filter_map(|role_id| roles.get(role_id))
            .flat_map(|role| {
                role.permissions()
                    .iter()
                    .map(|grant| (role.role_id(), grant.clone()))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    async fn find_permission(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.permissions.read().await.get(key.as_str()).cloned())
    }
}

#[async_trait]
impl TeamRepository for InMemorySecurityRepository {
    async fn find_team(&self, team_id: TeamId) -> AppResult<Option<Team>> {
        Ok(self
            .teams
            .read()
            .await
            .get(&team_id)
            .filter(|team| !team.is_deleted())
            .cloned())
    }

    async fn list_descendants(
        &self,
        team_id: TeamId,
        max_depth: u32,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        Ok(self
            .collect_descendants(team_id, max_depth)
            .await
            .into_iter()
            .filter(|team| matches_search(team, search))
            .collect())
    }

    async fn list_ancestors(&self, team_id: TeamId, max_depth: u32) -> AppResult<Vec<Team>> {
        let teams = self.teams.read().await;
        let mut chain = Vec::new();
        let mut current = teams
            .get(&team_id)
            .filter(|team| !team.is_deleted())
            .and_then(Team::parent_team_id);

        for _ in 0..max_depth {
            let Some(parent_id) = current else {
                break;
            };
            let Some(parent) = teams.get(&parent_id).filter(|team| !team.is_deleted()) else {
                break;
            };
            chain.push(parent.clone());
            current = parent.parent_team_id();
        }

        Ok(chain)
    }

    async fn list_siblings(
        &self,
        team_id: TeamId,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        let teams = self.teams.read().await;
        let Some(target) = teams.get(&team_id).filter(|team| !team.is_deleted()) else {
            return Ok(Vec::new());
        };

        let parent = target.parent_team_id();
        let mut siblings: Vec<Team> = teams
            .values()
            .filter(|candidate| {
                !candidate.is_deleted()
                    && candidate.team_id() != team_id
                    && candidate.parent_team_id() == parent
                    && matches_search(candidate, search)
            })
            .cloned()
            .collect();
        siblings.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(siblings)
    }

    async fn list_descendants_with_role(
        &self,
        team_id: TeamId,
        role_id: RoleId,
        max_depth: u32,
    ) -> AppResult<Vec<TeamWithRole>> {
        let assignments = self.assignments.read().await;
        Ok(self
            .collect_descendants(team_id, max_depth)
            .await
            .into_iter()
            .map(|team| {
                let team_role_id = assignments
                    .values()
                    .find(|assignment| {
                        assignment.team_id() == team.team_id()
                            && assignment.role_id() == role_id
                            && assignment.is_active()
                    })
                    .map(TeamRoleAssignment::team_role_id);
                TeamWithRole { team, team_role_id }
            })
            .collect())
    }
}

#[async_trait]
impl SecurityAdminRepository for InMemorySecurityRepository {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn save_role(&self, role: RoleDefinition) -> AppResult<()> {
        self.roles.write().await.insert(role.role_id(), role);
        Ok(())
    }

    async fn update_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<RolePermission>,
    ) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let role = roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.set_permissions(permissions);
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.roles
            .write()
            .await
            .remove(&role_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|assignment| assignment.role_id() == role_id && assignment.is_active())
            .count() as u64)
    }

    async fn count_active_assignments_for_role_in_team(
        &self,
        role_id: RoleId,
        team_id: TeamId,
    ) -> AppResult<u64> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|assignment| {
                assignment.role_id() == role_id
                    && assignment.team_id() == team_id
                    && assignment.is_active()
            })
            .count() as u64)
    }

    async fn find_assignment(
        &self,
        team_role_id: TeamRoleId,
    ) -> AppResult<Option<TeamRoleAssignment>> {
        Ok(self.assignments.read().await.get(&team_role_id).cloned())
    }

    async fn save_assignment(&self, assignment: TeamRoleAssignment) -> AppResult<()> {
        self.assignments
            .write()
            .await
            .insert(assignment.team_role_id(), assignment);
        Ok(())
    }

    async fn save_team(&self, team: Team) -> AppResult<()> {
        self.teams.write().await.insert(team.team_id(), team);
        Ok(())
    }
}
