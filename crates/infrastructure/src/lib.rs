//! Infrastructure adapters for the authorization ports.

#![forbid(unsafe_code)]

mod in_memory_permission_cache;
mod in_memory_security_repository;
mod postgres_authorization_repository;
mod postgres_security_admin_repository;
mod postgres_team_repository;
mod redis_permission_cache;

pub use in_memory_permission_cache::InMemoryPermissionCache;
pub use in_memory_security_repository::InMemorySecurityRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
pub use postgres_team_repository::PostgresTeamRepository;
pub use redis_permission_cache::RedisPermissionCache;

/// Matches a `*`-wildcard pattern against a candidate key.
pub(crate) fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let first = segments[0];
    let last = segments[segments.len() - 1];
    if !candidate.starts_with(first) || !candidate.ends_with(last) {
        return false;
    }
    if candidate.len() < first.len() + last.len() {
        return false;
    }

    let mut window = &candidate[first.len()..candidate.len() - last.len()];
    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match window.find(segment) {
            Some(found) => window = &window[found + segment.len()..],
            None => return false,
        }
    }

    true
}
