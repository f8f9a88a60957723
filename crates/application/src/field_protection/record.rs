use sentra_core::{AppResult, TeamId, UserId, UserIdentity};
use sentra_domain::PermissionKey;
use serde_json::Value;

/// Base capability a record type opts into to be protectable.
///
/// The protection services work purely against this surface; nothing is
/// probed reflectively.
pub trait SecuredRecord: Send + Sync {
    /// Returns the base permission key protecting this record type.
    fn permission_key(&self) -> PermissionKey;

    /// Returns a stable identifier for the record instance.
    fn record_id(&self) -> String;

    /// Returns one attribute value.
    fn attribute(&self, column: &str) -> Option<&Value>;

    /// Removes one attribute value from the materialized set.
    fn remove_attribute(&mut self, column: &str) -> Option<Value>;

    /// Per-record escape flag a caller can set to skip protection.
    fn skip_protection(&self) -> bool {
        false
    }

    /// Owner of the record, when the type tracks ownership.
    fn owner_user_id(&self) -> Option<UserId> {
        None
    }
}

/// Capability for record types that can name their owning team.
pub trait TeamOwned {
    /// Returns the owning team, when the type computes it directly.
    fn owning_team(&self) -> Option<TeamId> {
        None
    }

    /// Marks record types that are themselves the team type; their own id
    /// is the team id.
    fn is_team_record(&self) -> bool {
        false
    }
}

/// Capability for record types carrying their own bypass rules.
pub trait CustomBypass {
    /// Returns an explicit bypass grant for the viewer. `Some(true)` grants
    /// the bypass; anything else falls through to the next strategy.
    fn bypass_decision(&self, viewer: &UserIdentity) -> Option<bool> {
        let _ = viewer;
        None
    }

    /// Users allowed to see the record regardless of permission grants.
    ///
    /// Evaluated inside a bypass window: implementations may consult data
    /// that is itself protected without recursing into the resolution
    /// pipeline. Errors deny the bypass and are logged by the caller.
    fn allowed_user_ids(&self) -> AppResult<Vec<UserId>> {
        Ok(Vec::new())
    }
}
