use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use sentra_core::{AppError, AppResult, RoleId, TeamId, UserId};
use sentra_domain::{
    AccessDecision, GrantSource, PermissionEntry, PermissionKey, PermissionType, RolePermission,
    TeamRoleAssignment, resolve_entries,
};
use serde_json::Value;

use crate::context::{AccessContext, ExecutionMode};
use crate::security_ports::{
    AuthorizationRepository, DECISIONS_TAG, PermissionCache, TREE_TAG, decision_cache_key,
    granted_teams_cache_key, user_cache_tag,
};
use crate::{SecurityConfig, TeamHierarchyService};

/// Resolves effective permissions from roles, direct overrides and
/// hierarchy-propagated assignments.
///
/// Resolution is a pure function of store and cache state; the only side
/// effect is cache population. A refusal is an expected outcome on the read
/// path and an `AppError::PermissionDenied` on the mutation path.
#[derive(Clone)]
pub struct PermissionResolver {
    repository: Arc<dyn AuthorizationRepository>,
    hierarchy: TeamHierarchyService,
    cache: Arc<dyn PermissionCache>,
    config: SecurityConfig,
}

impl PermissionResolver {
    /// Creates a resolver from its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuthorizationRepository>,
        hierarchy: TeamHierarchyService,
        cache: Arc<dyn PermissionCache>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            repository,
            hierarchy,
            cache,
            config,
        }
    }

    /// Returns whether a user holds the required permission, optionally
    /// scoped to one team.
    ///
    /// A denial anywhere beats a grant everywhere: any applicable `Deny`
    /// entry resolves to `false` regardless of other grants, and the
    /// unscoped check collects entries from every active assignment.
    pub async fn has_permission(
        &self,
        context: &AccessContext,
        user_id: UserId,
        key: &PermissionKey,
        required: PermissionType,
        team_scope: Option<TeamId>,
    ) -> AppResult<bool> {
        if self.is_exempt(context, user_id) {
            return Ok(true);
        }

        let cache_key = decision_cache_key(user_id, key, required.as_str(), team_scope);
        if let Some(Value::Bool(decision)) = context.memo_get(&cache_key) {
            return Ok(decision);
        }
        if let Some(decision) = self.cached_decision(&cache_key).await {
            context.memo_put(cache_key, Value::Bool(decision));
            return Ok(decision);
        }

        let decision = self
            .resolve_uncached(context, user_id, key, required, team_scope)
            .await?;

        self.store_decision(&cache_key, user_id, decision).await;
        context.memo_put(cache_key, Value::Bool(decision));
        Ok(decision)
    }

    /// Ensures a user holds the required permission, raising the structured
    /// denial used by mutating operations.
    pub async fn require_permission(
        &self,
        context: &AccessContext,
        user_id: UserId,
        key: &PermissionKey,
        required: PermissionType,
        team_scope: Option<TeamId>,
    ) -> AppResult<()> {
        if self
            .has_permission(context, user_id, key, required, team_scope)
            .await?
        {
            return Ok(());
        }

        Err(AppError::PermissionDenied {
            permission_key: key.as_str().to_owned(),
            required_type: required.as_str().to_owned(),
            team_ids: team_scope.into_iter().map(|team| team.as_uuid()).collect(),
        })
    }

    /// Resolves, in one pass over the user's assignments, every team for
    /// which the required permission holds, writing each team's decision
    /// into the shared cache.
    ///
    /// Used by batch protection to turn per-record checks into per-team
    /// cache hits; the per-team outcome is identical to a scoped
    /// `has_permission` call.
    pub async fn teams_with_permission(
        &self,
        context: &AccessContext,
        user_id: UserId,
        key: &PermissionKey,
        required: PermissionType,
    ) -> AppResult<BTreeSet<TeamId>> {
        let assignments = self
            .repository
            .list_active_assignments(user_id, None)
            .await?;
        let role_grants = self.role_grants_for(assignments.iter()).await?;

        let mut entries_per_team: BTreeMap<TeamId, Vec<PermissionEntry>> = BTreeMap::new();
        for assignment in &assignments {
            let Some(entry) = entry_for(assignment, &role_grants, key) else {
                continue;
            };
            for team_id in self.granted_teams(context, assignment).await? {
                entries_per_team.entry(team_id).or_default().push(entry);
            }
        }

        let no_opinion_decision = self.no_opinion_decision(key).await?;
        let mut allowed = BTreeSet::new();
        for (team_id, entries) in entries_per_team {
            let decision = match resolve_entries(&entries, required) {
                AccessDecision::Allow(_) => true,
                AccessDecision::Deny(_) => false,
                AccessDecision::NoOpinion => no_opinion_decision,
            };

            let cache_key = decision_cache_key(user_id, key, required.as_str(), Some(team_id));
            self.store_decision(&cache_key, user_id, decision).await;
            context.memo_put(cache_key, Value::Bool(decision));

            if decision {
                allowed.insert(team_id);
            }
        }

        Ok(allowed)
    }

    fn is_exempt(&self, context: &AccessContext, user_id: UserId) -> bool {
        if self.config.bypass_all
            || context.is_in_bypass()
            || context.execution_mode() == ExecutionMode::NonInteractive
        {
            return true;
        }

        context
            .viewer()
            .is_some_and(|viewer| viewer.user_id() == user_id && viewer.is_super_admin())
    }

    async fn resolve_uncached(
        &self,
        context: &AccessContext,
        user_id: UserId,
        key: &PermissionKey,
        required: PermissionType,
        team_scope: Option<TeamId>,
    ) -> AppResult<bool> {
        let assignments = match team_scope {
            Some(scope) => {
                let filter = self.expanded_scope(scope).await?;
                self.repository
                    .list_active_assignments(user_id, Some(&filter))
                    .await?
            }
            None => {
                self.repository
                    .list_active_assignments(user_id, None)
                    .await?
            }
        };

        let mut applicable = Vec::new();
        for assignment in &assignments {
            match team_scope {
                Some(scope) => {
                    if self
                        .granted_teams(context, assignment)
                        .await?
                        .contains(&scope)
                    {
                        applicable.push(assignment);
                    }
                }
                None => applicable.push(assignment),
            }
        }

        let role_grants = self.role_grants_for(applicable.iter().copied()).await?;
        let entries: Vec<PermissionEntry> = applicable
            .iter()
            .filter_map(|assignment| entry_for(assignment, &role_grants, key))
            .collect();

        match resolve_entries(&entries, required) {
            AccessDecision::Allow(_) => Ok(true),
            AccessDecision::Deny(_) => Ok(false),
            AccessDecision::NoOpinion => self.no_opinion_decision(key).await,
        }
    }

    /// The scope a check is narrowed to also has to see assignments attached
    /// to ancestors (they may propagate below) and to siblings (they may
    /// propagate to neighbours).
    async fn expanded_scope(&self, scope: TeamId) -> AppResult<Vec<TeamId>> {
        let mut candidates = BTreeSet::from([scope]);
        for team in self.hierarchy.ancestors(scope).await? {
            candidates.insert(team.team_id());
        }
        for team in self.hierarchy.siblings(scope, None).await? {
            candidates.insert(team.team_id());
        }
        Ok(candidates.into_iter().collect())
    }

    /// Computes the set of teams one assignment actually grants, memoised
    /// per unit of work and cached across requests.
    async fn granted_teams(
        &self,
        context: &AccessContext,
        assignment: &TeamRoleAssignment,
    ) -> AppResult<BTreeSet<TeamId>> {
        let cache_key = granted_teams_cache_key(assignment.team_role_id());
        if let Some(value) = context.memo_get(&cache_key) {
            if let Ok(teams) = serde_json::from_value::<BTreeSet<TeamId>>(value) {
                return Ok(teams);
            }
        }
        if let Some(value) = self.cache_get(&cache_key).await {
            if let Ok(teams) = serde_json::from_value::<BTreeSet<TeamId>>(value.clone()) {
                context.memo_put(cache_key, value);
                return Ok(teams);
            }
        }

        let mode = assignment.hierarchy_mode();
        let mut teams = BTreeSet::from([assignment.team_id()]);
        if mode.grants_below() {
            for team in self
                .hierarchy
                .descendants(assignment.team_id(), None, None)
                .await?
            {
                teams.insert(team.team_id());
            }
        }
        if mode.grants_neighbours() {
            for team in self.hierarchy.siblings(assignment.team_id(), None).await? {
                teams.insert(team.team_id());
            }
        }

        if let Ok(encoded) = serde_json::to_value(&teams) {
            context.memo_put(cache_key.clone(), encoded.clone());
            let tags = [
                DECISIONS_TAG.to_owned(),
                TREE_TAG.to_owned(),
                user_cache_tag(assignment.user_id()),
            ];
            if let Err(error) = self
                .cache
                .put(
                    &cache_key,
                    encoded,
                    self.config.decision_ttl_seconds,
                    &tags,
                )
                .await
            {
                tracing::debug!(cache_key, %error, "granted-team cache write failed");
            }
        }

        Ok(teams)
    }

    async fn role_grants_for<'a>(
        &self,
        assignments: impl Iterator<Item = &'a TeamRoleAssignment>,
    ) -> AppResult<Vec<(RoleId, RolePermission)>> {
        let role_ids: Vec<RoleId> = assignments
            .map(TeamRoleAssignment::role_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.repository.list_role_permissions(&role_ids).await
    }

    /// Outcome when no entry spoke for the key: a key with no registered
    /// definition is unrestricted unless configured to deny, a defined key
    /// with no grant is a refusal.
    async fn no_opinion_decision(&self, key: &PermissionKey) -> AppResult<bool> {
        if self.repository.find_permission(key).await?.is_none() {
            return Ok(!self.config.undefined_permissions_are_denied);
        }

        Ok(false)
    }

    async fn cached_decision(&self, cache_key: &str) -> Option<bool> {
        self.cache_get(cache_key).await.and_then(|value| value.as_bool())
    }

    async fn store_decision(&self, cache_key: &str, user_id: UserId, decision: bool) {
        let tags = [DECISIONS_TAG.to_owned(), user_cache_tag(user_id)];
        if let Err(error) = self
            .cache
            .put(
                cache_key,
                Value::Bool(decision),
                self.config.decision_ttl_seconds,
                &tags,
            )
            .await
        {
            tracing::debug!(cache_key, %error, "decision cache write failed");
        }
    }

    async fn cache_get(&self, cache_key: &str) -> Option<Value> {
        match self.cache.get(cache_key).await {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(cache_key, %error, "decision cache read failed, recomputing");
                None
            }
        }
    }
}

fn entry_for(
    assignment: &TeamRoleAssignment,
    role_grants: &[(RoleId, RolePermission)],
    key: &PermissionKey,
) -> Option<PermissionEntry> {
    if let Some(direct) = assignment.override_for(key) {
        return Some(PermissionEntry {
            permission_type: direct.permission_type,
            source: GrantSource::DirectOverride,
        });
    }

    role_grants
        .iter()
        .find(|(role_id, grant)| *role_id == assignment.role_id() && &grant.key == key)
        .map(|(_, grant)| PermissionEntry {
            permission_type: grant.permission_type,
            source: GrantSource::RolePermission,
        })
}

#[cfg(test)]
mod tests;
