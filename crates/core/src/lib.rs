//! Shared primitives for all Rust crates in Sentra.

#![forbid(unsafe_code)]

/// Viewer principal shared across services.
pub mod auth;
/// Identifier newtypes for users, teams, roles and assignments.
pub mod ids;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use auth::UserIdentity;
pub use ids::{RoleId, TeamId, TeamRoleId, UserId};

/// Result type used across Sentra crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Returns a short stable hex digest used to build bounded cache keys.
#[must_use]
pub fn short_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut encoded = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        encoded.push_str(&format!("{byte:02x}"));
    }
    encoded
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller identity is missing where one is required.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is identified but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Structured denial raised by mutating operations so callers can
    /// distinguish a policy refusal from other failures.
    #[error(
        "permission denied: '{permission_key}' requires '{required_type}' \
         (teams: {team_ids:?})"
    )]
    PermissionDenied {
        /// Permission key that was checked.
        permission_key: String,
        /// Required permission type storage value.
        required_type: String,
        /// Teams that were in scope for the check.
        team_ids: Vec<uuid::Uuid>,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
