use super::*;

use sentra_domain::Team;

use crate::security_ports::DomainEvent;

impl SecurityAdminService {
    /// Creates a team, optionally under a parent.
    pub async fn create_team(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        name: impl Into<String> + Send,
        parent_team_id: Option<TeamId>,
    ) -> AppResult<Team> {
        self.require_admin(context, actor).await?;

        if let Some(parent_id) = parent_team_id {
            self.hierarchy.team(parent_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("parent team '{parent_id}' was not found"))
            })?;
        }

        let team = Team::new(TeamId::new(), name, parent_team_id)?;
        self.repository.save_team(team.clone()).await?;

        self.invalidation
            .handle(&DomainEvent::TeamCreated {
                team_ids: vec![team.team_id()],
            })
            .await?;
        Ok(team)
    }

    /// Moves a team under a new parent, or to the root.
    pub async fn move_team(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        team_id: TeamId,
        new_parent_id: Option<TeamId>,
    ) -> AppResult<Team> {
        self.require_admin(context, actor).await?;

        let mut team = self
            .hierarchy
            .team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("team '{team_id}' was not found")))?;

        if let Some(parent_id) = new_parent_id {
            self.hierarchy.team(parent_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("parent team '{parent_id}' was not found"))
            })?;
            // is_descendant is reflexive, so this also refuses self-parenting.
            if self.hierarchy.is_descendant(team_id, parent_id).await? {
                return Err(AppError::Conflict(format!(
                    "team '{team_id}' cannot be moved under its own descendant '{parent_id}'"
                )));
            }
        }

        team.set_parent_team_id(new_parent_id);
        self.repository.save_team(team.clone()).await?;

        self.invalidation
            .handle(&DomainEvent::TeamHierarchyChanged {
                team_ids: vec![team_id],
            })
            .await?;
        Ok(team)
    }

    /// Soft-deletes a team, removing it from traversal.
    pub async fn delete_team(
        &self,
        context: &AccessContext,
        actor: &UserIdentity,
        team_id: TeamId,
    ) -> AppResult<()> {
        self.require_admin(context, actor).await?;

        let mut team = self
            .hierarchy
            .team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("team '{team_id}' was not found")))?;

        let children = self.hierarchy.descendants(team_id, Some(1), None).await?;
        if !children.is_empty() {
            return Err(AppError::Conflict(format!(
                "team '{}' still has {} child teams",
                team.name(),
                children.len()
            )));
        }

        team.mark_deleted(Self::now());
        self.repository.save_team(team).await?;

        self.invalidation
            .handle(&DomainEvent::TeamHierarchyChanged {
                team_ids: vec![team_id],
            })
            .await
    }
}
