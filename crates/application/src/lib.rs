//! Authorization services and ports.

#![forbid(unsafe_code)]

mod batch_permission;
mod config;
mod context;
mod field_protection;
mod invalidation;
mod permission_resolver;
mod security_admin_service;
mod security_ports;
mod team_hierarchy_service;
#[cfg(test)]
mod test_support;

pub use batch_permission::BatchPermission;
pub use config::SecurityConfig;
pub use context::{AccessContext, BypassScope, ExecutionMode, ProtectScope};
pub use field_protection::{
    CustomBypass, FieldProtection, ProtectionStrategy, SecuredRecord, SensitivityRegistry,
    SensitivityRule, TeamOwned, TeamResolution,
};
pub use invalidation::CacheInvalidationManager;
pub use permission_resolver::PermissionResolver;
pub use security_admin_service::{AssignRoleInput, CreateRoleInput, SecurityAdminService};
pub use security_ports::{
    AuthorizationRepository, DomainEvent, PermissionCache, SecurityAdminRepository,
    TeamRepository, TeamWithRole, decision_cache_key, granted_teams_cache_key, user_cache_tag,
    DECISIONS_TAG, TREE_TAG,
};
pub use team_hierarchy_service::TeamHierarchyService;
