//! Authenticated caller and role tiers.

use serde::{Deserialize, Serialize};

pub const USER: &str = "user";
pub const MODERATOR: &str = "moderator";
pub const ADMINISTRATOR: &str = "administrator";
pub const OWNER: &str = "owner";

/// Roles accepted by moderator-tier routes.
pub const MODERATOR_ROLES: &[&str] = &[MODERATOR, ADMINISTRATOR, OWNER];
/// Roles accepted by administrator-tier routes.
pub const ADMINISTRATOR_ROLES: &[&str] = &[ADMINISTRATOR, OWNER];
/// Roles accepted by owner-tier routes.
pub const OWNER_ROLES: &[&str] = &[OWNER];

/// The caller behind a request, resolved from its bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub role: String,
    /// Account state, e.g. "active" or "locked".
    pub state: String,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
            state: state.into(),
        }
    }

    /// Exact membership: the role must be one of `roles`, no hierarchy implied.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| *role == self.role)
    }
}
