use sentra_core::{AppResult, NonEmptyString, RoleId};
use serde::{Deserialize, Serialize};

use crate::{PermissionKey, PermissionType};

/// Grant attaching a permission type to a key at role level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Permission key the grant covers.
    pub key: PermissionKey,
    /// Access level granted or denied for the key.
    pub permission_type: PermissionType,
}

/// Named bundle of permission grants assignable to users per team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    role_id: RoleId,
    name: NonEmptyString,
    from_system: bool,
    max_assignments_per_team: Option<u32>,
    permissions: Vec<RolePermission>,
}

impl RoleDefinition {
    /// Creates a role definition with a validated name.
    pub fn new(
        role_id: RoleId,
        name: impl Into<String>,
        from_system: bool,
        max_assignments_per_team: Option<u32>,
        permissions: Vec<RolePermission>,
    ) -> AppResult<Self> {
        Ok(Self {
            role_id,
            name: NonEmptyString::new(name)?,
            from_system,
            max_assignments_per_team,
            permissions,
        })
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether the role is system-managed, immutable and
    /// non-deletable.
    #[must_use]
    pub fn is_from_system(&self) -> bool {
        self.from_system
    }

    /// Returns the per-team assignment limit, if one is set.
    #[must_use]
    pub fn max_assignments_per_team(&self) -> Option<u32> {
        self.max_assignments_per_team
    }

    /// Returns the role's permission grants.
    #[must_use]
    pub fn permissions(&self) -> &[RolePermission] {
        &self.permissions
    }

    /// Returns the role's grant for a key, if one exists.
    #[must_use]
    pub fn permission_for(&self, key: &PermissionKey) -> Option<&RolePermission> {
        self.permissions.iter().find(|grant| &grant.key == key)
    }

    /// Replaces the role's permission grants.
    pub fn set_permissions(&mut self, permissions: Vec<RolePermission>) {
        self.permissions = permissions;
    }
}
