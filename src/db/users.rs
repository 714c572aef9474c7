//! Database queries for users.

use crate::db::pool::DbPool;
use crate::db::{placeholders, DbError};
use crate::models::{ReviewPullRequest, User};

const USER_COLUMNS: &str = "id, user_id, username, team_id, is_active";

/// Look up a user by external id.
pub async fn find_by_user_id(pool: &DbPool, user_id: &str) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Look up a user by internal id.
pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// All members of a team, active or not, ordered by external id.
pub async fn list_team_members(pool: &DbPool, team_id: i64) -> Result<Vec<User>, DbError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE team_id = ? ORDER BY user_id"
    ))
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Set a user's active flag, returning the updated user and its team name.
pub async fn set_is_active(
    pool: &DbPool,
    user_id: &str,
    is_active: bool,
) -> Result<Option<(User, String)>, DbError> {
    let updated = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = ? WHERE user_id = ? RETURNING {USER_COLUMNS}"
    ))
    .bind(is_active)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(user) = updated else {
        return Ok(None);
    };

    let (team_name,): (String,) = sqlx::query_as("SELECT name FROM teams WHERE id = ?")
        .bind(user.team_id)
        .fetch_one(pool)
        .await?;

    Ok(Some((user, team_name)))
}

/// Deactivate the currently active members of `team_id` listed in `user_ids`.
///
/// Ids that are unknown, belong to another team, or are already inactive are
/// ignored. Returns the users that actually flipped to inactive.
pub async fn bulk_deactivate(
    pool: &DbPool,
    team_id: i64,
    user_ids: &[String],
) -> Result<Vec<User>, DbError> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "UPDATE users SET is_active = 0 WHERE team_id = ? AND is_active = 1 AND user_id IN ({}) RETURNING {USER_COLUMNS}",
        placeholders(user_ids.len())
    );
    let mut q = sqlx::query_as::<_, User>(&query).bind(team_id);
    for user_id in user_ids {
        q = q.bind(user_id);
    }

    let mut users = q.fetch_all(pool).await?;
    users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    Ok(users)
}

/// Active members of `team_id` whose internal id is not in `excluded`.
pub async fn list_active_excluding(
    pool: &DbPool,
    team_id: i64,
    excluded: &[i64],
) -> Result<Vec<User>, DbError> {
    let exclusion = if excluded.is_empty() {
        String::new()
    } else {
        format!(" AND id NOT IN ({})", placeholders(excluded.len()))
    };
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 AND team_id = ?{exclusion} ORDER BY user_id"
    );
    let mut q = sqlx::query_as::<_, User>(&query).bind(team_id);
    for id in excluded {
        q = q.bind(*id);
    }

    let users = q.fetch_all(pool).await?;
    Ok(users)
}

/// Pull requests on which `user_id` currently holds a reviewer slot.
pub async fn review_pull_requests(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<ReviewPullRequest>, DbError> {
    let prs = sqlx::query_as::<_, ReviewPullRequest>(
        r#"
        SELECT pr.pr_id AS pull_request_id, pr.title, author.user_id AS author_user_id, pr.status
        FROM pr_reviews r
        JOIN pull_requests pr ON pr.id = r.pr_id
        JOIN users reviewer ON reviewer.id = r.reviewer_id
        JOIN users author ON author.id = pr.author_id
        WHERE reviewer.user_id = ?
        ORDER BY pr.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(prs)
}
