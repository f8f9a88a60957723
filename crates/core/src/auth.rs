use serde::{Deserialize, Serialize};

use crate::UserId;

/// Identified principal on whose behalf authorization decisions run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    super_admin: bool,
}

impl UserIdentity {
    /// Creates a viewer identity from already-authenticated data.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>, super_admin: bool) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            super_admin,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns whether the user holds the administrative override.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.super_admin
    }
}
