//! Team model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A team of users. Reviewers are always drawn from the author's team.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Team {
    /// Internal row id.
    pub id: i64,

    /// Unique team name.
    pub name: String,
}

/// Member supplied when a team is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}
