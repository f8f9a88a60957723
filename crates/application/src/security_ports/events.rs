use sentra_core::{RoleId, TeamId, UserId};
use sentra_domain::PermissionKey;

/// Domain mutation notifications consumed by the invalidation manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// Role assignments changed for a set of users.
    RoleAssignmentChanged {
        /// Users whose assignments changed.
        user_ids: Vec<UserId>,
    },
    /// The permission grants of a set of roles changed.
    RolePermissionsChanged {
        /// Roles whose grants changed.
        role_ids: Vec<RoleId>,
    },
    /// Teams moved inside the tree or were soft-deleted.
    TeamHierarchyChanged {
        /// Teams whose parent link changed.
        team_ids: Vec<TeamId>,
    },
    /// New teams were created.
    TeamCreated {
        /// The created teams.
        team_ids: Vec<TeamId>,
    },
    /// Permission definitions were created, renamed or removed.
    PermissionDefinitionChanged {
        /// Keys whose definitions changed.
        permission_keys: Vec<PermissionKey>,
    },
}
