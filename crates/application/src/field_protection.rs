mod record;

pub use record::{CustomBypass, SecuredRecord, TeamOwned};

use std::collections::HashMap;
use std::sync::Arc;

use sentra_core::{AppResult, TeamId};
use sentra_domain::{PermissionKey, PermissionType};
use serde_json::Value;
use uuid::Uuid;

use crate::context::{AccessContext, ExecutionMode};
use crate::{PermissionResolver, SecurityConfig};

/// When sensitive columns are hidden from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionStrategy {
    /// Strip sensitive columns from the attribute set at load time.
    Eager,
    /// Keep values in place and redact on column access, so records whose
    /// sensitive columns are never read cost no permission check.
    Lazy,
}

/// Declared sensitivity of one record type.
#[derive(Debug, Clone, Default)]
pub struct SensitivityRule {
    /// Columns hidden from viewers without the sensitive-column permission.
    pub sensitive_columns: Vec<String>,
    /// Strategy override; absent means the configured default.
    pub strategy: Option<ProtectionStrategy>,
    /// Attribute naming the owning team id, when it is not `team_id`.
    pub team_column: Option<String>,
    /// Validates records owned by the viewer as well, disabling the owner
    /// bypass. Absent means the configured default.
    pub validate_owned_records: Option<bool>,
}

impl SensitivityRule {
    /// Creates a rule hiding the given columns with inherited defaults.
    #[must_use]
    pub fn new(sensitive_columns: Vec<String>) -> Self {
        Self {
            sensitive_columns,
            ..Self::default()
        }
    }

    /// Pins the eager strategy for this type.
    #[must_use]
    pub fn eager(mut self) -> Self {
        self.strategy = Some(ProtectionStrategy::Eager);
        self
    }

    /// Pins the lazy strategy for this type.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.strategy = Some(ProtectionStrategy::Lazy);
        self
    }

    /// Declares the attribute carrying the owning team id.
    #[must_use]
    pub fn with_team_column(mut self, column: impl Into<String>) -> Self {
        self.team_column = Some(column.into());
        self
    }

    /// Overrides whether viewer-owned records are validated as well.
    #[must_use]
    pub fn validate_owned(mut self, validate: bool) -> Self {
        self.validate_owned_records = Some(validate);
        self
    }
}

/// Per-type sensitivity rules, keyed by base permission key.
#[derive(Debug, Clone, Default)]
pub struct SensitivityRegistry {
    rules: HashMap<String, SensitivityRule>,
}

impl SensitivityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the sensitivity rule for a record type.
    pub fn register(&mut self, key: &PermissionKey, rule: SensitivityRule) {
        self.rules.insert(key.as_str().to_owned(), rule);
    }

    /// Returns the rule for a record type, if one is configured.
    #[must_use]
    pub fn rule_for(&self, key: &PermissionKey) -> Option<&SensitivityRule> {
        self.rules.get(key.as_str())
    }
}

/// Outcome of resolving the team a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamResolution {
    /// The record belongs to this team.
    Team(TeamId),
    /// The record legitimately has no team; checks run globally.
    NoTeam,
    /// Resolution failed; the record is treated conservatively.
    Failed,
}

/// Hides sensitive columns on records the viewer may not fully read.
///
/// Failures while computing sensitivity resolve to the safe choice, hiding
/// the column, and are logged rather than surfaced.
#[derive(Clone)]
pub struct FieldProtection {
    resolver: PermissionResolver,
    registry: Arc<SensitivityRegistry>,
    config: SecurityConfig,
}

impl FieldProtection {
    /// Creates a protection service from the resolver and declared rules.
    #[must_use]
    pub fn new(
        resolver: PermissionResolver,
        registry: Arc<SensitivityRegistry>,
        config: SecurityConfig,
    ) -> Self {
        Self {
            resolver,
            registry,
            config,
        }
    }

    /// Applies load-time protection to one record.
    ///
    /// Eagerly protected types lose their sensitive columns here when the
    /// viewer lacks access; lazily protected types defer entirely until a
    /// column is read. Reentrant processing of the same record returns it
    /// untouched.
    pub async fn protect<R>(&self, context: &AccessContext, record: &mut R) -> AppResult<()>
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        let key = record.permission_key();
        let Some(rule) = self.registry.rule_for(&key) else {
            return Ok(());
        };

        let record_id = record.record_id();
        let Some(_processing) = context.begin_protect(key.as_str(), record_id.as_str()) else {
            return Ok(());
        };

        if self.strategy_for(rule) == ProtectionStrategy::Lazy {
            return Ok(());
        }

        if !self.can_read_sensitive(context, record, rule).await {
            strip(record, rule);
        }

        Ok(())
    }

    /// Reads one attribute through the lazy interceptor.
    ///
    /// A sensitive column on a lazily protected record yields `None` when
    /// the viewer lacks access; the decision is computed on first access and
    /// memoised for the unit of work.
    pub async fn read_attribute<R>(
        &self,
        context: &AccessContext,
        record: &R,
        column: &str,
    ) -> AppResult<Option<Value>>
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        let key = record.permission_key();
        let Some(rule) = self.registry.rule_for(&key) else {
            return Ok(record.attribute(column).cloned());
        };

        if !rule.sensitive_columns.iter().any(|name| name == column) {
            return Ok(record.attribute(column).cloned());
        }

        match self.strategy_for(rule) {
            // Eager types were stripped at load time; whatever is still
            // present is readable.
            ProtectionStrategy::Eager => Ok(record.attribute(column).cloned()),
            ProtectionStrategy::Lazy => {
                if self.can_read_sensitive(context, record, rule).await {
                    Ok(record.attribute(column).cloned())
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Applies redaction in place regardless of strategy, for callers about
    /// to serialize a record.
    pub async fn materialize<R>(
        &self,
        context: &AccessContext,
        record: &mut R,
    ) -> AppResult<()>
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        let key = record.permission_key();
        let Some(rule) = self.registry.rule_for(&key) else {
            return Ok(());
        };

        let record_id = record.record_id();
        let Some(_processing) = context.begin_protect(key.as_str(), record_id.as_str()) else {
            return Ok(());
        };

        if !self.can_read_sensitive(context, record, rule).await {
            strip(record, rule);
        }

        Ok(())
    }

    /// Returns whether the viewer may read the record's sensitive columns.
    /// Never errors; failure hides the columns.
    pub(crate) async fn can_read_sensitive<R>(
        &self,
        context: &AccessContext,
        record: &R,
        rule: &SensitivityRule,
    ) -> bool
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        if self.record_bypass(context, record, rule).await {
            return true;
        }

        let Some(viewer) = context.viewer() else {
            return false;
        };

        let key = record.permission_key();
        let team_scope = match self.owning_team(record, rule) {
            TeamResolution::Team(team_id) => Some(team_id),
            TeamResolution::NoTeam => None,
            TeamResolution::Failed => {
                tracing::warn!(
                    record_type = key.as_str(),
                    record_id = %record.record_id(),
                    "owning team resolution failed, hiding sensitive columns"
                );
                return false;
            }
        };
        let team_scope = self.config.restrict_by_team.then_some(team_scope).flatten();

        match self
            .resolver
            .has_permission(
                context,
                viewer.user_id(),
                &key.sensitive_columns_key(),
                PermissionType::Read,
                team_scope,
            )
            .await
        {
            Ok(decision) => decision,
            Err(error) => {
                tracing::warn!(
                    record_type = key.as_str(),
                    record_id = %record.record_id(),
                    %error,
                    "sensitive-column check failed, hiding sensitive columns"
                );
                false
            }
        }
    }

    /// Evaluates the bypass ladder for one record; first grant wins.
    async fn record_bypass<R>(
        &self,
        context: &AccessContext,
        record: &R,
        rule: &SensitivityRule,
    ) -> bool
    where
        R: SecuredRecord + TeamOwned + CustomBypass,
    {
        if self.config.bypass_all
            || context.is_in_bypass()
            || context.execution_mode() == ExecutionMode::NonInteractive
        {
            return true;
        }

        if record.skip_protection() {
            return true;
        }

        let Some(viewer) = context.viewer() else {
            return false;
        };

        let validate_owned = rule
            .validate_owned_records
            .unwrap_or(self.config.validate_owned_records);
        if !validate_owned && record.owner_user_id() == Some(viewer.user_id()) {
            return true;
        }

        if record.bypass_decision(viewer) == Some(true) {
            return true;
        }

        // The allow-list may consult protected data; the bypass window keeps
        // that evaluation from recursing into the resolution pipeline.
        let allowed = {
            let _window = context.bypass_scope();
            record.allowed_user_ids()
        };
        match allowed {
            Ok(users) => users.contains(&viewer.user_id()),
            Err(error) => {
                tracing::warn!(
                    record_type = record.permission_key().as_str(),
                    record_id = %record.record_id(),
                    %error,
                    "allow-list evaluation failed, bypass denied"
                );
                false
            }
        }
    }

    /// Resolves the record's owning team: custom hook, then the team type
    /// itself, then the declared or conventional team column.
    pub(crate) fn owning_team<R>(&self, record: &R, rule: &SensitivityRule) -> TeamResolution
    where
        R: SecuredRecord + TeamOwned,
    {
        if let Some(team_id) = record.owning_team() {
            return TeamResolution::Team(team_id);
        }

        if record.is_team_record() {
            return match Uuid::parse_str(record.record_id().as_str()) {
                Ok(id) => TeamResolution::Team(TeamId::from_uuid(id)),
                Err(_) => TeamResolution::Failed,
            };
        }

        let column = rule.team_column.as_deref().unwrap_or("team_id");
        match record.attribute(column) {
            None | Some(Value::Null) => TeamResolution::NoTeam,
            Some(Value::String(raw)) => match Uuid::parse_str(raw) {
                Ok(id) => TeamResolution::Team(TeamId::from_uuid(id)),
                Err(_) => TeamResolution::Failed,
            },
            Some(_) => TeamResolution::Failed,
        }
    }

    pub(crate) fn strategy_for(&self, rule: &SensitivityRule) -> ProtectionStrategy {
        rule.strategy.unwrap_or(if self.config.lazy_field_protection {
            ProtectionStrategy::Lazy
        } else {
            ProtectionStrategy::Eager
        })
    }

    pub(crate) fn registry(&self) -> &SensitivityRegistry {
        &self.registry
    }
}

fn strip<R: SecuredRecord>(record: &mut R, rule: &SensitivityRule) {
    for column in &rule.sensitive_columns {
        record.remove_attribute(column);
    }
}
