/// Runtime toggles read by the engine at decision time.
///
/// The embedding application owns and loads these values; the engine never
/// persists them.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Treats every check as satisfied. Maintenance hatch, off by default.
    pub bypass_all: bool,
    /// Denies permission keys that have no registered definition instead of
    /// treating them as unrestricted.
    pub undefined_permissions_are_denied: bool,
    /// Scopes field-protection checks by the record's owning team. When off,
    /// sensitive-column checks run globally even for team-owned records.
    pub restrict_by_team: bool,
    /// Validates records owned by the viewer as well, disabling the owner
    /// bypass for types that do not choose their own setting.
    pub validate_owned_records: bool,
    /// Default protection strategy for record types that do not pick one.
    pub lazy_field_protection: bool,
    /// Bound on recursive tree traversal depth.
    pub max_hierarchy_depth: u32,
    /// Lifetime of cached permission decisions, in seconds.
    pub decision_ttl_seconds: u32,
    /// Lifetime of cached hierarchy traversals, in seconds.
    pub hierarchy_ttl_seconds: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            bypass_all: false,
            undefined_permissions_are_denied: false,
            restrict_by_team: true,
            validate_owned_records: false,
            lazy_field_protection: false,
            max_hierarchy_depth: 50,
            decision_ttl_seconds: 900,
            hierarchy_ttl_seconds: 3600,
        }
    }
}

impl SecurityConfig {
    /// Returns the effective traversal depth for an optional caller bound.
    #[must_use]
    pub fn effective_depth(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.max_hierarchy_depth)
            .min(self.max_hierarchy_depth)
    }
}
