use serde::{Deserialize, Serialize};

use crate::PermissionType;

/// Where a collected permission entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// Direct override attached to a single team-role assignment.
    DirectOverride,
    /// Grant owned by the assignment's role.
    RolePermission,
}

/// One permission entry collected from an applicable assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionEntry {
    /// Access level the entry carries.
    pub permission_type: PermissionType,
    /// Origin of the entry.
    pub source: GrantSource,
}

/// Outcome of merging every applicable permission entry for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// A satisfying grant was found and no entry denied.
    Allow(GrantSource),
    /// At least one entry denied the key.
    Deny(GrantSource),
    /// No entry spoke for the key.
    NoOpinion,
}

/// Merges collected entries into one decision.
///
/// Precedence is fixed: any `Deny` entry wins over every grant, from any
/// source; otherwise the first entry satisfying the requirement allows.
/// Callers that gave direct overrides precedence at collection time get
/// override-beats-role behavior without this function knowing about it.
#[must_use]
pub fn resolve_entries(entries: &[PermissionEntry], required: PermissionType) -> AccessDecision {
    if let Some(denied) = entries
        .iter()
        .find(|entry| entry.permission_type == PermissionType::Deny)
    {
        return AccessDecision::Deny(denied.source);
    }

    entries
        .iter()
        .find(|entry| entry.permission_type.satisfies(required))
        .map_or(AccessDecision::NoOpinion, |entry| {
            AccessDecision::Allow(entry.source)
        })
}
