mod admin;
mod authorization;
mod cache;
mod events;
mod teams;

pub use admin::SecurityAdminRepository;
pub use authorization::AuthorizationRepository;
pub use cache::{
    DECISIONS_TAG, PermissionCache, TREE_TAG, decision_cache_key, granted_teams_cache_key,
    user_cache_tag,
};
pub use events::DomainEvent;
pub use teams::{TeamRepository, TeamWithRole};
