use std::collections::BTreeSet;

use sentra_core::{AppResult, TeamId, UserIdentity};
use sentra_domain::PermissionType;

use crate::context::AccessContext;
use crate::field_protection::{
    CustomBypass, FieldProtection, SecuredRecord, TeamOwned, TeamResolution,
};
use crate::{PermissionResolver, SecurityConfig};

/// Protects a homogeneous record collection with one permission resolution
/// per distinct owning team instead of one per record.
///
/// The per-record outcome is identical to the single-record path; batching
/// only changes how often the resolver touches the store.
#[derive(Clone)]
pub struct BatchPermission {
    resolver: PermissionResolver,
    protection: FieldProtection,
    config: SecurityConfig,
}

impl BatchPermission {
    /// Creates a batch service sharing the resolver and protection caches.
    #[must_use]
    pub fn new(
        resolver: PermissionResolver,
        protection: FieldProtection,
        config: SecurityConfig,
    ) -> Self {
        Self {
            resolver,
            protection,
            config,
        }
    }

    /// Applies field protection to every record in place, pre-resolving one
    /// decision per distinct owning team.
    ///
    /// Ordering and record identity are preserved. Records whose team cannot
    /// be resolved are hidden conservatively by the single-record path.
    pub async fn batch_protect<R>(
        &self,
        context: &AccessContext,
        records: &mut [R],
    ) -> AppResult<()>
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let key = first.permission_key();
        let Some(rule) = self.protection.registry().rule_for(&key).cloned() else {
            return Ok(());
        };

        let Some(viewer_id) = context.viewer().map(UserIdentity::user_id) else {
            for record in records.iter_mut() {
                self.protection.materialize(context, record).await?;
            }
            return Ok(());
        };

        let mut team_buckets: BTreeSet<TeamId> = BTreeSet::new();
        let mut needs_global = false;
        for record in records.iter() {
            match self.protection.owning_team(record, &rule) {
                TeamResolution::Team(team_id) => {
                    team_buckets.insert(team_id);
                }
                TeamResolution::NoTeam => {
                    needs_global = true;
                }
                // Hidden by the single-record path without a resolver call.
                TeamResolution::Failed => {}
            }
        }
        if !self.config.restrict_by_team {
            team_buckets.clear();
            needs_global = true;
        }

        let facet = key.sensitive_columns_key();
        let preauthorized = self
            .resolver
            .teams_with_permission(context, viewer_id, &facet, PermissionType::Read)
            .await?;
        for team_id in &team_buckets {
            if !preauthorized.contains(team_id) {
                self.resolver
                    .has_permission(context, viewer_id, &facet, PermissionType::Read, Some(*team_id))
                    .await?;
            }
        }
        if needs_global {
            self.resolver
                .has_permission(context, viewer_id, &facet, PermissionType::Read, None)
                .await?;
        }

        for record in records.iter_mut() {
            self.protection.protect(context, record).await?;
        }

        Ok(())
    }
}
