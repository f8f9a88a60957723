use async_trait::async_trait;
use sentra_application::{TeamRepository, TeamWithRole};
use sentra_core::{AppError, AppResult, RoleId, TeamId, TeamRoleId};
use sentra_domain::Team;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed repository for team tree traversal.
///
/// Traversals use bounded recursive queries over the parent-pointer tree;
/// soft-deleted teams never enter the recursion.
#[derive(Clone)]
pub struct PostgresTeamRepository {
    pool: PgPool,
}

impl PostgresTeamRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    parent_team_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct TeamWithRoleRow {
    id: Uuid,
    name: String,
    parent_team_id: Option<Uuid>,
    team_role_id: Option<Uuid>,
}

fn restore_team(row: TeamRow) -> AppResult<Team> {
    Team::restore(
        TeamId::from_uuid(row.id),
        row.name,
        row.parent_team_id.map(TeamId::from_uuid),
        None,
    )
}

#[async_trait]
impl TeamRepository for PostgresTeamRepository {
    async fn find_team(&self, team_id: TeamId) -> AppResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT teams.id, teams.name, teams.parent_team_id
            FROM authz_teams AS teams
            WHERE teams.id = $1 AND teams.deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(team_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load team: {error}")))?;

        row.map(restore_team).transpose()
    }

    async fn list_descendants(
        &self,
        team_id: TeamId,
        max_depth: u32,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT teams.id, teams.name, teams.parent_team_id, 0 AS depth
                FROM authz_teams AS teams
                WHERE teams.id = $1 AND teams.deleted_at IS NULL
                UNION ALL
                SELECT child.id, child.name, child.parent_team_id, subtree.depth + 1
                FROM authz_teams AS child
                INNER JOIN subtree ON child.parent_team_id = subtree.id
                WHERE child.deleted_at IS NULL AND subtree.depth < $2
            )
            SELECT subtree.id, subtree.name, subtree.parent_team_id
            FROM subtree
            WHERE subtree.depth > 0
                AND ($3::text IS NULL OR subtree.name ILIKE '%' || $3 || '%')
            ORDER BY subtree.name
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(i64::from(max_depth))
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list descendants: {error}")))?;

        rows.into_iter().map(restore_team).collect()
    }

    async fn list_ancestors(&self, team_id: TeamId, max_depth: u32) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            WITH RECURSIVE lineage AS (
                SELECT teams.id, teams.name, teams.parent_team_id, 0 AS depth
                FROM authz_teams AS teams
                WHERE teams.id = $1 AND teams.deleted_at IS NULL
                UNION ALL
                SELECT parent.id, parent.name, parent.parent_team_id, lineage.depth + 1
                FROM authz_teams AS parent
                INNER JOIN lineage ON parent.id = lineage.parent_team_id
                WHERE parent.deleted_at IS NULL AND lineage.depth < $2
            )
            SELECT lineage.id, lineage.name, lineage.parent_team_id
            FROM lineage
            WHERE lineage.depth > 0
            ORDER BY lineage.depth
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(i64::from(max_depth))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list ancestors: {error}")))?;

        rows.into_iter().map(restore_team).collect()
    }

    async fn list_siblings(
        &self,
        team_id: TeamId,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT siblings.id, siblings.name, siblings.parent_team_id
            FROM authz_teams AS siblings
            INNER JOIN authz_teams AS target
                ON siblings.parent_team_id IS NOT DISTINCT FROM target.parent_team_id
            WHERE target.id = $1
                AND target.deleted_at IS NULL
                AND siblings.deleted_at IS NULL
                AND siblings.id <> target.id
                AND ($2::text IS NULL OR siblings.name ILIKE '%' || $2 || '%')
            ORDER BY siblings.name
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list siblings: {error}")))?;

        rows.into_iter().map(restore_team).collect()
    }

    async fn list_descendants_with_role(
        &self,
        team_id: TeamId,
        role_id: RoleId,
        max_depth: u32,
    ) -> AppResult<Vec<TeamWithRole>> {
        let rows = sqlx::query_as::<_, TeamWithRoleRow>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT teams.id, teams.name, teams.parent_team_id, 0 AS depth
                FROM authz_teams AS teams
                WHERE teams.id = $1 AND teams.deleted_at IS NULL
                UNION ALL
                SELECT child.id, child.name, child.parent_team_id, subtree.depth + 1
                FROM authz_teams AS child
                INNER JOIN subtree ON child.parent_team_id = subtree.id
                WHERE child.deleted_at IS NULL AND subtree.depth < $3
            )
            SELECT
                subtree.id,
                subtree.name,
                subtree.parent_team_id,
                team_roles.id AS team_role_id
            FROM subtree
            LEFT JOIN authz_team_roles AS team_roles
                ON team_roles.team_id = subtree.id
                AND team_roles.role_id = $2
                AND team_roles.suspended_at IS NULL
                AND team_roles.terminated_at IS NULL
                AND team_roles.deleted_at IS NULL
            WHERE subtree.depth > 0
            ORDER BY subtree.name
            "#,
        )
        .bind(team_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(i64::from(max_depth))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list descendants with role: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                let team = restore_team(TeamRow {
                    id: row.id,
                    name: row.name,
                    parent_team_id: row.parent_team_id,
                })?;
                Ok(TeamWithRole {
                    team,
                    team_role_id: row.team_role_id.map(TeamRoleId::from_uuid),
                })
            })
            .collect()
    }
}
