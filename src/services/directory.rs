//! Team and user directory operations.
//!
//! Plain CRUD around the entities the assignment engine reads. Changing a
//! single user's active flag here does not trigger reassignment; that is
//! what [`crate::services::assignment::AssignmentEngine::bulk_deactivate`]
//! is for.

use std::collections::HashSet;

use serde::Serialize;

use crate::db::pool::DbPool;
use crate::db::{teams, users, DbError};
use crate::error::AppError;
use crate::models::{NewTeamMember, ReviewPullRequest, Team, User};

/// Upper bound on members accepted in one team creation.
pub const MAX_TEAM_MEMBERS: usize = 200;

/// A team with its members ordered by user id.
#[derive(Debug, Clone, Serialize)]
pub struct TeamRoster {
    #[serde(skip)]
    pub team: Team,
    pub team_name: String,
    pub members: Vec<User>,
}

impl TeamRoster {
    fn new(team: Team, members: Vec<User>) -> Self {
        Self {
            team_name: team.name.clone(),
            team,
            members,
        }
    }
}

/// Check a team creation request and normalise its strings.
pub fn validate_new_team(
    team_name: &str,
    members: &[NewTeamMember],
) -> Result<(String, Vec<NewTeamMember>), AppError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(AppError::validation_field("team_name is required", "team_name"));
    }
    if members.is_empty() {
        return Err(AppError::validation_field("members must not be empty", "members"));
    }
    if members.len() > MAX_TEAM_MEMBERS {
        return Err(AppError::validation_field(
            format!("at most {MAX_TEAM_MEMBERS} members allowed"),
            "members",
        ));
    }

    let mut seen = HashSet::with_capacity(members.len());
    let mut normalised = Vec::with_capacity(members.len());
    for (i, member) in members.iter().enumerate() {
        let user_id = member.user_id.trim();
        let username = member.username.trim();
        if user_id.is_empty() {
            return Err(AppError::validation_field(
                format!("members[{i}].user_id is required"),
                "user_id",
            ));
        }
        if username.is_empty() {
            return Err(AppError::validation_field(
                format!("members[{i}].username is required"),
                "username",
            ));
        }
        if !seen.insert(user_id.to_string()) {
            return Err(AppError::validation_field(
                format!("duplicate user_id {user_id}"),
                "user_id",
            ));
        }
        normalised.push(NewTeamMember {
            user_id: user_id.to_string(),
            username: username.to_string(),
            is_active: member.is_active,
        });
    }

    Ok((team_name.to_string(), normalised))
}

/// Create a team with its members.
pub async fn add_team(
    pool: &DbPool,
    team_name: &str,
    members: &[NewTeamMember],
) -> Result<TeamRoster, AppError> {
    let (team_name, members) = validate_new_team(team_name, members)?;

    if teams::find_by_name(pool, &team_name).await?.is_some() {
        return Err(AppError::team_exists(team_name));
    }
    let user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
    if teams::any_user_exists(pool, &user_ids).await? {
        return Err(AppError::validation_field(
            "one of the user_ids already belongs to a team",
            "user_id",
        ));
    }

    let team = match teams::create_team_with_members(pool, &team_name, &members).await {
        Ok(team) => team,
        Err(DbError::Conflict(what)) if what == "team name" => {
            return Err(AppError::team_exists(team_name))
        }
        Err(DbError::Conflict(_)) => {
            return Err(AppError::validation_field(
                "one of the user_ids already belongs to a team",
                "user_id",
            ))
        }
        Err(err) => return Err(err.into()),
    };

    let members = teams::members(pool, team.id).await?;
    log::info!("Added team {} with {} members", team.name, members.len());
    Ok(TeamRoster::new(team, members))
}

/// Fetch a team and its members.
pub async fn get_team(pool: &DbPool, team_name: &str) -> Result<TeamRoster, AppError> {
    let team_name = team_name.trim();
    if team_name.is_empty() {
        return Err(AppError::validation_field("team_name is required", "team_name"));
    }

    let team = teams::find_by_name(pool, team_name)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("Team", team_name))?;
    let members = teams::members(pool, team.id).await?;
    Ok(TeamRoster::new(team, members))
}

/// Toggle one user's active flag. Returns the user and their team name.
pub async fn set_user_active(
    pool: &DbPool,
    user_id: &str,
    is_active: bool,
) -> Result<(User, String), AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::validation_field("user_id is required", "user_id"));
    }

    let (user, team_name) = users::set_is_active(pool, user_id, is_active)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("User", user_id))?;
    log::info!("User {} is_active={}", user.user_id, user.is_active);
    Ok((user, team_name))
}

/// Pull requests the user currently reviews. Unknown users simply have none.
pub async fn reviews_for_user(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<ReviewPullRequest>, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::validation_field("user_id is required", "user_id"));
    }

    Ok(users::review_pull_requests(pool, user_id).await?)
}
