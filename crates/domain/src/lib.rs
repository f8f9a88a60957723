//! Domain entities and invariants for the authorization engine.

#![forbid(unsafe_code)]

mod decision;
mod hierarchy;
mod permission;
mod role;
mod team;
mod team_role;

pub use decision::{AccessDecision, GrantSource, PermissionEntry, resolve_entries};
pub use hierarchy::HierarchyMode;
pub use permission::{
    PermissionDefinition, PermissionKey, PermissionType, SENSITIVE_COLUMNS_SUFFIX,
};
pub use role::{RoleDefinition, RolePermission};
pub use team::Team;
pub use team_role::{PermissionOverride, TeamRoleAssignment};
