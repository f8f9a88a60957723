use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sentra_core::{AppResult, RoleId, TeamId, TeamRoleId, UserId};
use sentra_domain::{
    PermissionDefinition, PermissionKey, RolePermission, Team, TeamRoleAssignment,
};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::security_ports::{
    AuthorizationRepository, PermissionCache, TeamRepository, TeamWithRole,
};

pub(crate) fn key(value: &str) -> PermissionKey {
    match PermissionKey::new(value) {
        Ok(key) => key,
        Err(_) => panic!("test key '{value}' must be valid"),
    }
}

pub(crate) fn team(team_id: TeamId, name: &str, parent: Option<TeamId>) -> Team {
    match Team::new(team_id, name, parent) {
        Ok(team) => team,
        Err(_) => panic!("test team '{name}' must be valid"),
    }
}

/// In-memory team tree with a traversal call counter.
#[derive(Default)]
pub(crate) struct FakeTeamRepository {
    pub teams: Mutex<HashMap<TeamId, Team>>,
    pub role_links: Mutex<Vec<(TeamId, RoleId, TeamRoleId)>>,
    pub traversals: AtomicUsize,
}

impl FakeTeamRepository {
    pub(crate) async fn insert(&self, team: Team) {
        self.teams.lock().await.insert(team.team_id(), team);
    }

    pub(crate) fn traversal_count(&self) -> usize {
        self.traversals.load(Ordering::Relaxed)
    }

    async fn live_teams(&self) -> Vec<Team> {
        self.teams
            .lock()
            .await
            .values()
            .filter(|team| !team.is_deleted())
            .cloned()
            .collect()
    }

    async fn collect_descendants(&self, team_id: TeamId, max_depth: u32) -> Vec<Team> {
        let teams = self.live_teams().await;
        let mut frontier = vec![team_id];
        let mut found = Vec::new();

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for team in &teams {
                if team
                    .parent_team_id()
                    .is_some_and(|parent| frontier.contains(&parent))
                {
                    next.push(team.team_id());
                    found.push(team.clone());
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        found.sort_by(|left, right| left.name().cmp(right.name()));
        found
    }
}

fn matches_search(team: &Team, search: Option<&str>) -> bool {
    search.is_none_or(|fragment| {
        team.name()
            .to_lowercase()
            .contains(fragment.to_lowercase().as_str())
    })
}

#[async_trait]
impl TeamRepository for FakeTeamRepository {
    async fn find_team(&self, team_id: TeamId) -> AppResult<Option<Team>> {
        Ok(self
            .teams
            .lock()
            .await
            .get(&team_id)
            .filter(|team| !team.is_deleted())
            .cloned())
    }

    async fn list_descendants(
        &self,
        team_id: TeamId,
        max_depth: u32,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        self.traversals.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .collect_descendants(team_id, max_depth)
            .await
            .into_iter()
            .filter(|team| matches_search(team, search))
            .collect())
    }

    async fn list_ancestors(&self, team_id: TeamId, max_depth: u32) -> AppResult<Vec<Team>> {
        self.traversals.fetch_add(1, Ordering::Relaxed);
        let teams = self.teams.lock().await;
        let mut chain = Vec::new();
        let mut current = teams
            .get(&team_id)
            .filter(|team| !team.is_deleted())
            .and_then(Team::parent_team_id);

        for _ in 0..max_depth {
            let Some(parent_id) = current else {
                break;
            };
            let Some(parent) = teams.get(&parent_id).filter(|team| !team.is_deleted()) else {
                break;
            };
            chain.push(parent.clone());
            current = parent.parent_team_id();
        }

        Ok(chain)
    }

    async fn list_siblings(
        &self,
        team_id: TeamId,
        search: Option<&str>,
    ) -> AppResult<Vec<Team>> {
        self.traversals.fetch_add(1, Ordering::Relaxed);
        let teams = self.teams.lock().await;
        let Some(target) = teams.get(&team_id).filter(|team| !team.is_deleted()) else {
            return Ok(Vec::new());
        };

        let parent = target.parent_team_id();
        let mut siblings: Vec<Team> = teams
            .values()
            .filter(|candidate| {
                !candidate.is_deleted()
                    && candidate.team_id() != team_id
                    && candidate.parent_team_id() == parent
                    && matches_search(candidate, search)
            })
            .cloned()
            .collect();
        siblings.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(siblings)
    }

    async fn list_descendants_with_role(
        &self,
        team_id: TeamId,
        role_id: RoleId,
        max_depth: u32,
    ) -> AppResult<Vec<TeamWithRole>> {
        self.traversals.fetch_add(1, Ordering::Relaxed);
        let links = self.role_links.lock().await.clone();
        Ok(self
            .collect_descendants(team_id, max_depth)
            .await
            .into_iter()
            .map(|team| {
                let team_role_id = links
                    .iter()
                    .find(|(linked_team, linked_role, _)| {
                        *linked_team == team.team_id() && *linked_role == role_id
                    })
                    .map(|(_, _, assignment)| *assignment);
                TeamWithRole { team, team_role_id }
            })
            .collect())
    }
}

/// In-memory authorization store with request counters.
#[derive(Default)]
pub(crate) struct FakeAuthorizationRepository {
    pub assignments: Mutex<Vec<TeamRoleAssignment>>,
    pub role_permissions: Mutex<HashMap<RoleId, Vec<RolePermission>>>,
    pub permissions: Mutex<HashMap<String, PermissionDefinition>>,
    pub assignment_queries: AtomicUsize,
}

impl FakeAuthorizationRepository {
    pub(crate) async fn add_assignment(&self, assignment: TeamRoleAssignment) {
        self.assignments.lock().await.push(assignment);
    }

    pub(crate) async fn grant(&self, role_id: RoleId, grant: RolePermission) {
        self.role_permissions
            .lock()
            .await
            .entry(role_id)
            .or_default()
            .push(grant);
    }

    pub(crate) async fn define_permission(&self, definition: PermissionDefinition) {
        self.permissions
            .lock()
            .await
            .insert(definition.key().as_str().to_owned(), definition);
    }

    pub(crate) fn assignment_query_count(&self) -> usize {
        self.assignment_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
        team_filter: Option<&[TeamId]>,
    ) -> AppResult<Vec<TeamRoleAssignment>> {
        self.assignment_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| {
                assignment.user_id() == user_id
                    && assignment.is_active()
                    && team_filter.is_none_or(|teams| teams.contains(&assignment.team_id()))
            })
            .cloned()
            .collect())
    }

    async fn list_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<(RoleId, RolePermission)>> {
        let grants = self.role_permissions.lock().await;
        Ok(role_ids
            .iter()
            .flat_map(|role_id| {
                grants
                    .get(role_id)
                    .into_iter()
                    .flatten()
                    .map(|grant| (*role_id, grant.clone()))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    async fn find_permission(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self.permissions.lock().await.get(key.as_str()).cloned())
    }
}

/// In-memory tag-aware cache fake. Entries never expire.
#[derive(Default)]
pub(crate) struct FakeCache {
    pub entries: Mutex<HashMap<String, (Value, Vec<String>)>>,
}

impl FakeCache {
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl PermissionCache for FakeCache {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        _ttl_seconds: u32,
        tags: &[String],
    ) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), (value, tags.to_vec()));
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .retain(|_, (_, tags)| !tags.iter().any(|candidate| candidate == tag));
        Ok(())
    }

    async fn invalidate_pattern(&self, tag: &str, pattern: &str) -> AppResult<()> {
        let fragment = pattern.trim_matches('*');
        self.entries.lock().await.retain(|key, (_, tags)| {
            !(tags.iter().any(|candidate| candidate == tag) && key.contains(fragment))
        });
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}
