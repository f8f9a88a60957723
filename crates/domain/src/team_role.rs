use sentra_core::{RoleId, TeamId, TeamRoleId, UserId};
use serde::{Deserialize, Serialize};

use crate::{HierarchyMode, PermissionKey, PermissionType};

/// Per-assignment grant that outranks the owning role's permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverride {
    /// Permission key the override covers.
    pub key: PermissionKey,
    /// Access level the override grants or denies.
    pub permission_type: PermissionType,
}

/// Link between a user, a team and a role, with lifecycle state and
/// hierarchy propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoleAssignment {
    team_role_id: TeamRoleId,
    user_id: UserId,
    team_id: TeamId,
    role_id: RoleId,
    hierarchy_mode: HierarchyMode,
    parent_team_role_id: Option<TeamRoleId>,
    suspended_at: Option<String>,
    terminated_at: Option<String>,
    deleted_at: Option<String>,
    overrides: Vec<PermissionOverride>,
}

impl TeamRoleAssignment {
    /// Creates an active assignment.
    #[must_use]
    pub fn new(
        team_role_id: TeamRoleId,
        user_id: UserId,
        team_id: TeamId,
        role_id: RoleId,
        hierarchy_mode: HierarchyMode,
    ) -> Self {
        Self {
            team_role_id,
            user_id,
            team_id,
            role_id,
            hierarchy_mode,
            parent_team_role_id: None,
            suspended_at: None,
            terminated_at: None,
            deleted_at: None,
            overrides: Vec::new(),
        }
    }

    /// Rehydrates a persisted assignment with its full lifecycle state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        team_role_id: TeamRoleId,
        user_id: UserId,
        team_id: TeamId,
        role_id: RoleId,
        hierarchy_mode: HierarchyMode,
        parent_team_role_id: Option<TeamRoleId>,
        suspended_at: Option<String>,
        terminated_at: Option<String>,
        deleted_at: Option<String>,
        overrides: Vec<PermissionOverride>,
    ) -> Self {
        Self {
            team_role_id,
            user_id,
            team_id,
            role_id,
            hierarchy_mode,
            parent_team_role_id,
            suspended_at,
            terminated_at,
            deleted_at,
            overrides,
        }
    }

    /// Returns the stable assignment identifier.
    #[must_use]
    pub fn team_role_id(&self) -> TeamRoleId {
        self.team_role_id
    }

    /// Returns the assigned user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the team the assignment is attached to.
    #[must_use]
    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns how the assignment radiates through the team tree.
    #[must_use]
    pub fn hierarchy_mode(&self) -> HierarchyMode {
        self.hierarchy_mode
    }

    /// Returns the ancestor assignment this one was derived from, if any.
    #[must_use]
    pub fn parent_team_role_id(&self) -> Option<TeamRoleId> {
        self.parent_team_role_id
    }

    /// Returns the suspension timestamp in RFC3339, if set.
    #[must_use]
    pub fn suspended_at(&self) -> Option<&str> {
        self.suspended_at.as_deref()
    }

    /// Returns the termination timestamp in RFC3339, if set.
    #[must_use]
    pub fn terminated_at(&self) -> Option<&str> {
        self.terminated_at.as_deref()
    }

    /// Returns the soft-delete timestamp in RFC3339, if set.
    #[must_use]
    pub fn deleted_at(&self) -> Option<&str> {
        self.deleted_at.as_deref()
    }

    /// Returns the assignment's direct permission overrides.
    #[must_use]
    pub fn overrides(&self) -> &[PermissionOverride] {
        &self.overrides
    }

    /// Returns the direct override for a key, if one exists.
    #[must_use]
    pub fn override_for(&self, key: &PermissionKey) -> Option<&PermissionOverride> {
        self.overrides.iter().find(|entry| &entry.key == key)
    }

    /// Replaces the assignment's direct overrides.
    pub fn set_overrides(&mut self, overrides: Vec<PermissionOverride>) {
        self.overrides = overrides;
    }

    /// Returns whether the assignment participates in resolution.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.suspended_at.is_none() && self.terminated_at.is_none() && self.deleted_at.is_none()
    }

    /// Suspends the assignment at the given RFC3339 timestamp.
    pub fn suspend(&mut self, suspended_at: impl Into<String>) {
        self.suspended_at = Some(suspended_at.into());
    }

    /// Terminates the assignment at the given RFC3339 timestamp and
    /// soft-deletes it.
    pub fn terminate(&mut self, terminated_at: impl Into<String>) {
        let stamp = terminated_at.into();
        self.terminated_at = Some(stamp.clone());
        self.deleted_at = Some(stamp);
    }

    /// Derives the child assignment auto-created under a propagating
    /// ancestor assignment: same user and role, self-only propagation, and
    /// a back reference to this assignment.
    #[must_use]
    pub fn derive_child(&self, team_role_id: TeamRoleId, child_team_id: TeamId) -> Self {
        Self {
            team_role_id,
            user_id: self.user_id,
            team_id: child_team_id,
            role_id: self.role_id,
            hierarchy_mode: HierarchyMode::SelfOnly,
            parent_team_role_id: Some(self.team_role_id),
            suspended_at: None,
            terminated_at: None,
            deleted_at: None,
            overrides: Vec::new(),
        }
    }
}
