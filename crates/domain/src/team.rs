use sentra_core::{AppResult, NonEmptyString, TeamId};
use serde::{Deserialize, Serialize};

/// Node in the strict organization tree.
///
/// A team has at most one parent; roots carry no parent id. Deletion is a
/// soft delete and deleted teams are invisible to traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    team_id: TeamId,
    name: NonEmptyString,
    parent_team_id: Option<TeamId>,
    deleted_at: Option<String>,
}

impl Team {
    /// Creates a team with a validated name.
    pub fn new(
        team_id: TeamId,
        name: impl Into<String>,
        parent_team_id: Option<TeamId>,
    ) -> AppResult<Self> {
        Ok(Self {
            team_id,
            name: NonEmptyString::new(name)?,
            parent_team_id,
            deleted_at: None,
        })
    }

    /// Rehydrates a persisted team including its soft-delete state.
    pub fn restore(
        team_id: TeamId,
        name: impl Into<String>,
        parent_team_id: Option<TeamId>,
        deleted_at: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            team_id,
            name: NonEmptyString::new(name)?,
            parent_team_id,
            deleted_at,
        })
    }

    /// Returns the stable team identifier.
    #[must_use]
    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    /// Returns the team name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the parent team id, absent for root teams.
    #[must_use]
    pub fn parent_team_id(&self) -> Option<TeamId> {
        self.parent_team_id
    }

    /// Reparents the team.
    pub fn set_parent_team_id(&mut self, parent_team_id: Option<TeamId>) {
        self.parent_team_id = parent_team_id;
    }

    /// Returns the soft-delete timestamp in RFC3339, if set.
    #[must_use]
    pub fn deleted_at(&self) -> Option<&str> {
        self.deleted_at.as_deref()
    }

    /// Returns whether the team is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the team soft-deleted at the given RFC3339 timestamp.
    pub fn mark_deleted(&mut self, deleted_at: impl Into<String>) {
        self.deleted_at = Some(deleted_at.into());
    }
}
