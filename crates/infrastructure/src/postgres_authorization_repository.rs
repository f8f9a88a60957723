use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sentra_application::AuthorizationRepository;
use sentra_core::{AppError, AppResult, RoleId, TeamId, TeamRoleId, UserId};
use sentra_domain::{
    HierarchyMode, PermissionDefinition, PermissionKey, PermissionOverride, PermissionType,
    RolePermission, TeamRoleAssignment,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed repository for permission resolution lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ActiveAssignmentRow {
    id: Uuid,
    user_id: Uuid,
    team_id: Uuid,
    role_id: Uuid,
    hierarchy_mode: String,
    parent_team_role_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    team_role_id: Uuid,
    permission_key: String,
    permission_type: i16,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: Uuid,
    permission_key: String,
    permission_type: i16,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    key: String,
    section: String,
    name: String,
    description: Option<String>,
    from_system: bool,
}

pub(crate) fn decode_grant(key: &str, code: i16) -> AppResult<(PermissionKey, PermissionType)> {
    Ok((PermissionKey::new(key)?, PermissionType::from_code(code)?))
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
        team_filter: Option<&[TeamId]>,
    ) -> AppResult<Vec<TeamRoleAssignment>> {
        let filter: Option<Vec<Uuid>> =
            team_filter.map(|teams| teams.iter().map(TeamId::as_uuid).collect());

        let rows = sqlx::query_as::<_, ActiveAssignmentRow>(
            r#"
            SELECT
                team_roles.id,
                team_roles.user_id,
                team_roles.team_id,
                team_roles.role_id,
                team_roles.hierarchy_mode,
                team_roles.parent_team_role_id
            FROM authz_team_roles AS team_roles
            WHERE team_roles.user_id = $1
                AND team_roles.suspended_at IS NULL
                AND team_roles.terminated_at IS NULL
                AND team_roles.deleted_at IS NULL
                AND ($2::uuid[] IS NULL OR team_roles.team_id = ANY($2))
            ORDER BY team_roles.id
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load assignments: {error}")))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let override_rows = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT overrides.team_role_id, overrides.permission_key, overrides.permission_type
            FROM authz_team_role_overrides AS overrides
            WHERE overrides.team_role_id = ANY($1)
            ORDER BY overrides.permission_key
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load assignment overrides: {error}"))
        })?;

        let mut overrides_by_assignment: HashMap<Uuid, Vec<PermissionOverride>> = HashMap::new();
        for row in override_rows {
            let (key, permission_type) = decode_grant(&row.permission_key, row.permission_type)?;
            overrides_by_assignment
                .entry(row.team_role_id)
                .or_default()
                .push(PermissionOverride {
                    key,
                    permission_type,
                });
        }

        rows.into_iter()
            .map(|row| {
                let hierarchy_mode =
                    HierarchyMode::from_str(row.hierarchy_mode.as_str()).map_err(|error| {
                        AppError::Internal(format!(
                            "failed to decode assignment '{}': {error}",
                            row.id
                        ))
                    })?;
                Ok(TeamRoleAssignment::restore(
                    TeamRoleId::from_uuid(row.id),
                    UserId::from_uuid(row.user_id),
                    TeamId::from_uuid(row.team_id),
                    RoleId::from_uuid(row.role_id),
                    hierarchy_mode,
                    row.parent_team_role_id.map(TeamRoleId::from_uuid),
                    None,
                    None,
                    None,
                    overrides_by_assignment.remove(&row.id).unwrap_or_default(),
                ))
            })
            .collect()
    }

    async fn list_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, RolePermission)>> {
        let ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT grants.role_id, grants.permission_key, grants.permission_type
            FROM authz_role_permissions AS grants
            WHERE grants.role_id = ANY($1)
            ORDER BY grants.role_id, grants.permission_key
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load role permissions: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                let (key, permission_type) =
                    decode_grant(&row.permission_key, row.permission_type)?;
                Ok((
                    RoleId::from_uuid(row.role_id),
                    RolePermission {
                        key,
                        permission_type,
                    },
                ))
            })
            .collect()
    }

    async fn find_permission(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permissions.key,
                permissions.section,
                permissions.name,
                permissions.description,
                permissions.from_system
            FROM authz_permissions AS permissions
            WHERE permissions.key = $1
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission: {error}")))?;

        row.map(|row| {
            Ok(PermissionDefinition::new(
                PermissionKey::new(row.key)?,
                row.section,
                row.name,
                row.description,
                row.from_system,
            ))
        })
        .transpose()
    }
}
