use std::str::FromStr;

use async_trait::async_trait;
use sentra_application::SecurityAdminRepository;
use sentra_core::{AppError, AppResult, RoleId, TeamId, TeamRoleId, UserId};
use sentra_domain::{
    HierarchyMode, PermissionOverride, RoleDefinition, RolePermission, Team, TeamRoleAssignment,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_authorization_repository::decode_grant;

/// PostgreSQL-backed repository for the role and team lifecycle.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    from_system: bool,
    max_assignments_per_team: Option<i64>,
}

#[derive(Debug, FromRow)]
struct RoleGrantRow {
    permission_key: String,
    permission_type: i16,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    user_id: Uuid,
    team_id: Uuid,
    role_id: Uuid,
    hierarchy_mode: String,
    parent_team_role_id: Option<Uuid>,
    suspended_at: Option<String>,
    terminated_at: Option<String>,
    deleted_at: Option<String>,
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT roles.id, roles.name, roles.from_system, roles.max_assignments_per_team
            FROM authz_roles AS roles
            WHERE roles.id = $1
            LIMIT 1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let grant_rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT grants.permission_key, grants.permission_type
            FROM authz_role_permissions AS grants
            WHERE grants.role_id = $1
            ORDER BY grants.permission_key
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role grants: {error}")))?;

        let mut permissions = Vec::with_capacity(grant_rows.len());
        for grant in grant_rows {
            let (key, permission_type) = decode_grant(&grant.permission_key, grant.permission_type)?;
            permissions.push(RolePermission {
                key,
                permission_type,
            });
        }

        let max_assignments = row
            .max_assignments_per_team
            .map(|value| {
                u32::try_from(value).map_err(|_| {
                    AppError::Internal(format!(
                        "invalid assignment limit '{value}' for role '{}'",
                        row.id
                    ))
                })
            })
            .transpose()?;

        Ok(Some(RoleDefinition::new(
            RoleId::from_uuid(row.id),
            row.name,
            row.from_system,
            max_assignments,
            permissions,
        )?))
    }

    async fn save_role(&self, role: RoleDefinition) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO authz_roles (id, name, from_system, max_assignments_per_team)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    max_assignments_per_team = EXCLUDED.max_assignments_per_team
            "#,
        )
        .bind(role.role_id().as_uuid())
        .bind(role.name())
        .bind(role.is_from_system())
        .bind(role.max_assignments_per_team().map(i64::from))
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist role: {error}")))?;

        for grant in role.permissions() {
            sqlx::query(
                r#"
                INSERT INTO authz_role_permissions (role_id, permission_key, permission_type)
                VALUES ($1, $2, $3)
                ON CONFLICT (role_id, permission_key) DO UPDATE
                    SET permission_type = EXCLUDED.permission_type
                "#,
            )
            .bind(role.role_id().as_uuid())
            .bind(grant.key.as_str())
            .bind(grant.permission_type.as_code())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist role grants: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn update_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<RolePermission>,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM authz_role_permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear role grants: {error}")))?;

        for grant in &permissions {
            sqlx::query(
                r#"
                INSERT INTO authz_role_permissions (role_id, permission_key, permission_type)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(grant.key.as_str())
            .bind(grant.permission_type.as_code())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist role grants: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM authz_roles
            WHERE id = $1 AND from_system = false
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found or is system-managed"
            )));
        }

        Ok(())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_team_roles
            WHERE role_id = $1
                AND suspended_at IS NULL
                AND terminated_at IS NULL
                AND deleted_at IS NULL
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn count_active_assignments_for_role_in_team(
        &self,
        role_id: RoleId,
        team_id: TeamId,
    ) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM authz_team_roles
            WHERE role_id = $1
                AND team_id = $2
                AND suspended_at IS NULL
                AND terminated_at IS NULL
                AND deleted_at IS NULL
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(team_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count assignments: {error}")))?;

        Ok(count.max(0) as u64)
    }

    async fn find_assignment(
        &self,
        team_role_id: TeamRoleId,
    ) -> AppResult<Option<TeamRoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                team_roles.id,
                team_roles.user_id,
                team_roles.team_id,
                team_roles.role_id,
                team_roles.hierarchy_mode,
                team_roles.parent_team_role_id,
                to_char(team_roles.suspended_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS suspended_at,
                to_char(team_roles.terminated_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS terminated_at,
                to_char(team_roles.deleted_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS deleted_at
            FROM authz_team_roles AS team_roles
            WHERE team_roles.id = $1
            LIMIT 1
            "#,
        )
        .bind(team_role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load assignment: {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let override_rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT overrides.permission_key, overrides.permission_type
            FROM authz_team_role_overrides AS overrides
            WHERE overrides.team_role_id = $1
            ORDER BY overrides.permission_key
            "#,
        )
        .bind(team_role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load assignment overrides: {error}"))
        })?;

        let mut overrides = Vec::with_capacity(override_rows.len());
        for entry in override_rows {
            let (key, permission_type) = decode_grant(&entry.permission_key, entry.permission_type)?;
            overrides.push(PermissionOverride {
                key,
                permission_type,
            });
        }

        let hierarchy_mode = HierarchyMode::from_str(row.hierarchy_mode.as_str())
            .map_err(|error| {
                AppError::Internal(format!("failed to decode assignment '{}': {error}", row.id))
            })?;

        Ok(Some(TeamRoleAssignment::restore(
            TeamRoleId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            TeamId::from_uuid(row.team_id),
            RoleId::from_uuid(row.role_id),
            hierarchy_mode,
            row.parent_team_role_id.map(TeamRoleId::from_uuid),
            row.suspended_at,
            row.terminated_at,
            row.deleted_at,
            overrides,
        )))
    }

    async fn save_assignment(&self, assignment: TeamRoleAssignment) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO authz_team_roles (
                id, user_id, team_id, role_id, hierarchy_mode, parent_team_role_id,
                suspended_at, terminated_at, deleted_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                $7::timestamptz, $8::timestamptz, $9::timestamptz
            )
            ON CONFLICT (id) DO UPDATE
                SET hierarchy_mode = EXCLUDED.hierarchy_mode,
                    suspended_at = EXCLUDED.suspended_at,
                    terminated_at = EXCLUDED.terminated_at,
                    deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(assignment.team_role_id().as_uuid())
        .bind(assignment.user_id().as_uuid())
        .bind(assignment.team_id().as_uuid())
        .bind(assignment.role_id().as_uuid())
        .bind(assignment.hierarchy_mode().as_str())
        .bind(assignment.parent_team_role_id().map(|id| id.as_uuid()))
        .bind(assignment.suspended_at())
        .bind(assignment.terminated_at())
        .bind(assignment.deleted_at())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist assignment: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM authz_team_role_overrides
            WHERE team_role_id = $1
            "#,
        )
        .bind(assignment.team_role_id().as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear assignment overrides: {error}"))
        })?;

        for entry in assignment.overrides() {
            sqlx::query(
                r#"
                INSERT INTO authz_team_role_overrides (team_role_id, permission_key, permission_type)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(assignment.team_role_id().as_uuid())
            .bind(entry.key.as_str())
            .bind(entry.permission_type.as_code())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist assignment overrides: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn save_team(&self, team: Team) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authz_teams (id, name, parent_team_id, deleted_at)
            VALUES ($1, $2, $3, $4::timestamptz)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    parent_team_id = EXCLUDED.parent_team_id,
                    deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(team.team_id().as_uuid())
        .bind(team.name())
        .bind(team.parent_team_id().map(|id| id.as_uuid()))
        .bind(team.deleted_at())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist team: {error}")))?;

        Ok(())
    }
}
