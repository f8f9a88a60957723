use std::sync::Arc;

use sentra_core::{AppError, RoleId, TeamId, TeamRoleId, UserId, UserIdentity};
use sentra_domain::{
    HierarchyMode, PermissionDefinition, PermissionType, RolePermission, TeamRoleAssignment,
};

use super::PermissionResolver;
use crate::context::AccessContext;
use crate::test_support::{FakeAuthorizationRepository, FakeCache, FakeTeamRepository, key, team};
use crate::{SecurityConfig, TeamHierarchyService};

struct Harness {
    resolver: PermissionResolver,
    repository: Arc<FakeAuthorizationRepository>,
    teams: Arc<FakeTeamRepository>,
    cache: Arc<FakeCache>,
}

fn harness_with(config: SecurityConfig) -> Harness {
    let repository = Arc::new(FakeAuthorizationRepository::default());
    let teams = Arc::new(FakeTeamRepository::default());
    let cache = Arc::new(FakeCache::default());
    let hierarchy = TeamHierarchyService::new(teams.clone(), cache.clone(), config.clone());
    let resolver = PermissionResolver::new(repository.clone(), hierarchy, cache.clone(), config);

    Harness {
        resolver,
        repository,
        teams,
        cache,
    }
}

fn harness() -> Harness {
    harness_with(SecurityConfig::default())
}

fn assignment(
    user_id: UserId,
    team_id: TeamId,
    role_id: RoleId,
    mode: HierarchyMode,
) -> TeamRoleAssignment {
    TeamRoleAssignment::new(TeamRoleId::new(), user_id, team_id, role_id, mode)
}

async fn define_invoice(harness: &Harness) {
    harness
        .repository
        .define_permission(PermissionDefinition::new(
            key("Invoice"),
            "billing",
            "Invoices",
            None,
            true,
        ))
        .await;
}

#[tokio::test]
async fn deny_in_one_team_blocks_that_team_and_global_resolution() {
    let harness = harness();
    let user_id = UserId::new();
    let team_a = TeamId::new();
    let team_b = TeamId::new();
    let reader_role = RoleId::new();
    let denied_role = RoleId::new();

    harness.teams.insert(team(team_a, "alpha", None)).await;
    harness.teams.insert(team(team_b, "beta", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(
            user_id,
            team_a,
            reader_role,
            HierarchyMode::SelfOnly,
        ))
        .await;
    harness
        .repository
        .add_assignment(assignment(
            user_id,
            team_b,
            denied_role,
            HierarchyMode::SelfOnly,
        ))
        .await;
    harness
        .repository
        .grant(
            reader_role,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;
    harness
        .repository
        .grant(
            denied_role,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Deny,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let scoped_allowed = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_a),
        )
        .await;
    let scoped_denied = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_b),
        )
        .await;
    let global = harness
        .resolver
        .has_permission(&context, user_id, &key("Invoice"), PermissionType::Read, None)
        .await;

    assert_eq!(scoped_allowed.ok(), Some(true));
    assert_eq!(scoped_denied.ok(), Some(false));
    assert_eq!(global.ok(), Some(false));
}

#[tokio::test]
async fn below_propagation_reaches_descendants_but_not_siblings() {
    let harness = harness();
    let user_id = UserId::new();
    let root = TeamId::new();
    let child = TeamId::new();
    let grandchild = TeamId::new();
    let neighbour = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(root, "root", None)).await;
    harness.teams.insert(team(child, "child", Some(root))).await;
    harness
        .teams
        .insert(team(grandchild, "grandchild", Some(child)))
        .await;
    harness
        .teams
        .insert(team(neighbour, "neighbour", Some(root)))
        .await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(user_id, child, role_id, HierarchyMode::Below))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    for (scope, expected) in [
        (child, true),
        (grandchild, true),
        (neighbour, false),
        (root, false),
    ] {
        let decision = harness
            .resolver
            .has_permission(
                &context,
                user_id,
                &key("Invoice"),
                PermissionType::Read,
                Some(scope),
            )
            .await;
        assert_eq!(decision.ok(), Some(expected), "scope {scope}");
    }
}

#[tokio::test]
async fn neighbour_propagation_is_the_exact_complement_of_below() {
    let harness = harness();
    let user_id = UserId::new();
    let root = TeamId::new();
    let child = TeamId::new();
    let grandchild = TeamId::new();
    let neighbour = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(root, "root", None)).await;
    harness.teams.insert(team(child, "child", Some(root))).await;
    harness
        .teams
        .insert(team(grandchild, "grandchild", Some(child)))
        .await;
    harness
        .teams
        .insert(team(neighbour, "neighbour", Some(root)))
        .await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(
            user_id,
            child,
            role_id,
            HierarchyMode::Neighbours,
        ))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    for (scope, expected) in [(child, true), (neighbour, true), (grandchild, false)] {
        let decision = harness
            .resolver
            .has_permission(
                &context,
                user_id,
                &key("Invoice"),
                PermissionType::Read,
                Some(scope),
            )
            .await;
        assert_eq!(decision.ok(), Some(expected), "scope {scope}");
    }
}

#[tokio::test]
async fn disabled_mode_grants_the_own_team_only() {
    let harness = harness();
    let user_id = UserId::new();
    let root = TeamId::new();
    let child = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(root, "root", None)).await;
    harness.teams.insert(team(child, "child", Some(root))).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(user_id, root, role_id, HierarchyMode::Disabled))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let own = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(root),
        )
        .await;
    let below = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(child),
        )
        .await;

    assert_eq!(own.ok(), Some(true));
    assert_eq!(below.ok(), Some(false));
}

#[tokio::test]
async fn direct_override_outranks_the_role_grant() {
    let harness = harness();
    let user_id = UserId::new();
    let team_id = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(team_id, "alpha", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Deny,
            },
        )
        .await;

    let mut granted = assignment(user_id, team_id, role_id, HierarchyMode::SelfOnly);
    granted.set_overrides(vec![sentra_domain::PermissionOverride {
        key: key("Invoice"),
        permission_type: PermissionType::All,
    }]);
    harness.repository.add_assignment(granted).await;

    let context = AccessContext::anonymous();
    let decision = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Write,
            Some(team_id),
        )
        .await;

    assert_eq!(decision.ok(), Some(true));
}

#[tokio::test]
async fn repeated_checks_are_idempotent_and_cache_served() {
    let harness = harness();
    let user_id = UserId::new();
    let team_id = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(team_id, "alpha", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(user_id, team_id, role_id, HierarchyMode::SelfOnly))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let first_context = AccessContext::anonymous();
    let first = harness
        .resolver
        .has_permission(
            &first_context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;
    let queries_after_first = harness.repository.assignment_query_count();

    let second_context = AccessContext::anonymous();
    let second = harness
        .resolver
        .has_permission(
            &second_context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;

    assert_eq!(first.ok(), Some(true));
    assert_eq!(second.ok(), Some(true));
    assert_eq!(harness.repository.assignment_query_count(), queries_after_first);
}

#[tokio::test]
async fn user_tag_eviction_makes_the_next_check_observe_fresh_state() {
    let harness = harness();
    let user_id = UserId::new();
    let team_id = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(team_id, "alpha", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(user_id, team_id, role_id, HierarchyMode::SelfOnly))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let before = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;
    assert_eq!(before.ok(), Some(true));

    harness.repository.assignments.lock().await.clear();

    use crate::security_ports::{PermissionCache, user_cache_tag};
    let evicted = harness
        .cache
        .invalidate_tag(user_cache_tag(user_id).as_str())
        .await;
    assert!(evicted.is_ok());

    let fresh_context = AccessContext::anonymous();
    let after = harness
        .resolver
        .has_permission(
            &fresh_context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;
    assert_eq!(after.ok(), Some(false));
}

#[tokio::test]
async fn role_assignment_events_invalidate_cached_decisions() {
    let harness = harness();
    let user_id = UserId::new();
    let team_id = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(team_id, "alpha", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(user_id, team_id, role_id, HierarchyMode::SelfOnly))
        .await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let before = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;
    assert_eq!(before.ok(), Some(true));

    harness.repository.assignments.lock().await.clear();
    let manager = crate::CacheInvalidationManager::new(harness.cache.clone());
    let handled = manager
        .handle(&crate::security_ports::DomainEvent::RoleAssignmentChanged {
            user_ids: vec![user_id],
        })
        .await;
    assert!(handled.is_ok());

    let fresh_context = AccessContext::anonymous();
    let after = harness
        .resolver
        .has_permission(
            &fresh_context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;
    assert_eq!(after.ok(), Some(false));
}

#[tokio::test]
async fn zero_assignments_resolve_to_false_for_defined_keys() {
    let harness = harness();
    define_invoice(&harness).await;

    let context = AccessContext::anonymous();
    let decision = harness
        .resolver
        .has_permission(
            &context,
            UserId::new(),
            &key("Invoice"),
            PermissionType::Read,
            None,
        )
        .await;

    assert_eq!(decision.ok(), Some(false));
}

#[tokio::test]
async fn undefined_keys_follow_the_configured_default() {
    let open = harness();
    let context = AccessContext::anonymous();
    let lenient = open
        .resolver
        .has_permission(
            &context,
            UserId::new(),
            &key("Unregistered"),
            PermissionType::Read,
            None,
        )
        .await;
    assert_eq!(lenient.ok(), Some(true));

    let strict = harness_with(SecurityConfig {
        undefined_permissions_are_denied: true,
        ..SecurityConfig::default()
    });
    let denied = strict
        .resolver
        .has_permission(
            &context,
            UserId::new(),
            &key("Unregistered"),
            PermissionType::Read,
            None,
        )
        .await;
    assert_eq!(denied.ok(), Some(false));
}

#[tokio::test]
async fn suspended_assignments_are_excluded_from_resolution() {
    let harness = harness();
    let user_id = UserId::new();
    let team_id = TeamId::new();
    let role_id = RoleId::new();

    harness.teams.insert(team(team_id, "alpha", None)).await;
    define_invoice(&harness).await;
    let mut suspended = assignment(user_id, team_id, role_id, HierarchyMode::SelfOnly);
    suspended.suspend("2026-01-01T00:00:00Z");
    harness.repository.add_assignment(suspended).await;
    harness
        .repository
        .grant(
            role_id,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let decision = harness
        .resolver
        .has_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Read,
            Some(team_id),
        )
        .await;

    assert_eq!(decision.ok(), Some(false));
}

#[tokio::test]
async fn execution_context_and_super_admin_are_globally_exempt() {
    let harness = harness();
    define_invoice(&harness).await;
    let user_id = UserId::new();

    let batch = AccessContext::non_interactive();
    let batch_decision = harness
        .resolver
        .has_permission(&batch, user_id, &key("Invoice"), PermissionType::All, None)
        .await;
    assert_eq!(batch_decision.ok(), Some(true));

    let admin = AccessContext::interactive(UserIdentity::new(user_id, "root", true));
    let admin_decision = harness
        .resolver
        .has_permission(&admin, user_id, &key("Invoice"), PermissionType::All, None)
        .await;
    assert_eq!(admin_decision.ok(), Some(true));

    let bypassed = AccessContext::anonymous();
    let _scope = bypassed.bypass_scope();
    let bypass_decision = harness
        .resolver
        .has_permission(&bypassed, user_id, &key("Invoice"), PermissionType::All, None)
        .await;
    assert_eq!(bypass_decision.ok(), Some(true));
}

#[tokio::test]
async fn require_permission_raises_the_structured_denial() {
    let harness = harness();
    define_invoice(&harness).await;
    let user_id = UserId::new();
    let team_id = TeamId::new();
    harness.teams.insert(team(team_id, "alpha", None)).await;

    let context = AccessContext::anonymous();
    let refusal = harness
        .resolver
        .require_permission(
            &context,
            user_id,
            &key("Invoice"),
            PermissionType::Write,
            Some(team_id),
        )
        .await;

    match refusal {
        Err(AppError::PermissionDenied {
            permission_key,
            required_type,
            team_ids,
        }) => {
            assert_eq!(permission_key, "Invoice");
            assert_eq!(required_type, "write");
            assert_eq!(team_ids, vec![team_id.as_uuid()]);
        }
        other => panic!("expected a structured denial, got {other:?}"),
    }
}

#[tokio::test]
async fn teams_with_permission_matches_scoped_resolution() {
    let harness = harness();
    let user_id = UserId::new();
    let team_a = TeamId::new();
    let team_b = TeamId::new();
    let team_c = TeamId::new();
    let reader_role = RoleId::new();
    let denied_role = RoleId::new();

    harness.teams.insert(team(team_a, "alpha", None)).await;
    harness.teams.insert(team(team_b, "beta", None)).await;
    harness.teams.insert(team(team_c, "gamma", None)).await;
    define_invoice(&harness).await;
    harness
        .repository
        .add_assignment(assignment(
            user_id,
            team_a,
            reader_role,
            HierarchyMode::SelfOnly,
        ))
        .await;
    harness
        .repository
        .add_assignment(assignment(
            user_id,
            team_b,
            denied_role,
            HierarchyMode::SelfOnly,
        ))
        .await;
    harness
        .repository
        .grant(
            reader_role,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Read,
            },
        )
        .await;
    harness
        .repository
        .grant(
            denied_role,
            RolePermission {
                key: key("Invoice"),
                permission_type: PermissionType::Deny,
            },
        )
        .await;

    let context = AccessContext::anonymous();
    let allowed = harness
        .resolver
        .teams_with_permission(&context, user_id, &key("Invoice"), PermissionType::Read)
        .await
        .unwrap_or_default();

    assert!(allowed.contains(&team_a));
    assert!(!allowed.contains(&team_b));
    assert!(!allowed.contains(&team_c));

    for (scope, expected) in [(team_a, true), (team_b, false), (team_c, false)] {
        let fresh = AccessContext::anonymous();
        let scoped = harness
            .resolver
            .has_permission(
                &fresh,
                user_id,
                &key("Invoice"),
                PermissionType::Read,
                Some(scope),
            )
            .await;
        assert_eq!(scoped.ok(), Some(expected), "scope {scope}");
    }
}
