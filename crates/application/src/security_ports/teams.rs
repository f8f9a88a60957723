use async_trait::async_trait;
use sentra_core::{AppResult, RoleId, TeamId, TeamRoleId};
use sentra_domain::Team;
use serde::{Deserialize, Serialize};

/// Descendant team joined with the assignment a role already has there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWithRole {
    /// The descendant team.
    pub team: Team,
    /// Assignment id for the role in that team, when one exists.
    pub team_role_id: Option<TeamRoleId>,
}

/// Repository port for team tree traversal.
///
/// All operations exclude soft-deleted teams, and an unknown team id yields
/// an empty result rather than an error.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Looks up a live team by id.
    async fn find_team(&self, team_id: TeamId) -> AppResult<Option<Team>>;

    /// Lists descendant teams via bounded recursive traversal, optionally
    /// filtered by a case-insensitive name fragment.
    async fn list_descendants(
        &self,
        team_id: TeamId,
        max_depth: u32,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>>;

    /// Lists ancestor teams nearest-first via bounded traversal.
    async fn list_ancestors(&self, team_id: TeamId, max_depth: u32) -> AppResult<Vec<Team>>;

    /// Lists teams sharing the same parent, the team itself excluded,
    /// optionally filtered by a case-insensitive name fragment.
    async fn list_siblings(&self, team_id: TeamId, search: Option<&str>)
    -> AppResult<Vec<Team>>;

    /// Lists descendant teams joined with the matching assignment for a
    /// role, in one traversal.
    async fn list_descendants_with_role(
        &self,
        team_id: TeamId,
        role_id: RoleId,
        max_depth: u32,
    ) -> AppResult<Vec<TeamWithRole>>;
}
