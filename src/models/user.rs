//! User model.

use serde::Serialize;
use sqlx::FromRow;

/// A team member who can author pull requests and review them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    /// Internal row id.
    #[serde(skip)]
    pub id: i64,

    /// External user identifier, unique across all teams.
    pub user_id: String,

    /// Display name.
    pub username: String,

    /// Internal id of the owning team.
    #[serde(skip)]
    pub team_id: i64,

    /// Inactive users are never picked as reviewers.
    pub is_active: bool,
}
