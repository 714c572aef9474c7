//! Database queries for teams.

use crate::db::pool::DbPool;
use crate::db::DbError;
use crate::models::{NewTeamMember, Team, User};

/// Insert a team and all of its members in one transaction.
///
/// Fails with [`DbError::Conflict`] when the team name or any member's
/// `user_id` is already taken; nothing is written in that case.
pub async fn create_team_with_members(
    pool: &DbPool,
    team_name: &str,
    members: &[NewTeamMember],
) -> Result<Team, DbError> {
    let mut tx = pool.begin().await?;

    let team: Team = sqlx::query_as("INSERT INTO teams (name) VALUES (?) RETURNING id, name")
        .bind(team_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from_write(e, "team name"))?;

    for member in members {
        sqlx::query("INSERT INTO users (user_id, username, team_id, is_active) VALUES (?, ?, ?, ?)")
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(team.id)
            .bind(member.is_active)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_write(e, "user id"))?;
    }

    tx.commit().await?;
    Ok(team)
}

/// Look up a team by its unique name.
pub async fn find_by_name(pool: &DbPool, team_name: &str) -> Result<Option<Team>, DbError> {
    let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE name = ?")
        .bind(team_name)
        .fetch_optional(pool)
        .await?;

    Ok(team)
}

/// Whether any of `user_ids` already belongs to some team.
pub async fn any_user_exists(pool: &DbPool, user_ids: &[String]) -> Result<bool, DbError> {
    if user_ids.is_empty() {
        return Ok(false);
    }

    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM users WHERE user_id IN ({}))",
        crate::db::placeholders(user_ids.len())
    );
    let mut q = sqlx::query_as::<_, (bool,)>(&query);
    for user_id in user_ids {
        q = q.bind(user_id);
    }

    let (exists,) = q.fetch_one(pool).await?;
    Ok(exists)
}

/// Team members ordered by external id.
pub async fn members(pool: &DbPool, team_id: i64) -> Result<Vec<User>, DbError> {
    crate::db::users::list_team_members(pool, team_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn member(id: &str, active: bool) -> NewTeamMember {
        NewTeamMember {
            user_id: id.to_string(),
            username: format!("{id}-name"),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_team() {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("t.db")).await.unwrap();

        let team = create_team_with_members(&pool, "core", &[member("u2", true), member("u1", false)])
            .await
            .unwrap();

        let found = find_by_name(&pool, "core").await.unwrap().unwrap();
        assert_eq!(found.id, team.id);

        let users = members(&pool, team.id).await.unwrap();
        let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert!(!users[0].is_active);
    }

    #[tokio::test]
    async fn test_duplicate_team_name_is_conflict() {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("t.db")).await.unwrap();

        create_team_with_members(&pool, "core", &[member("u1", true)]).await.unwrap();
        let err = create_team_with_members(&pool, "core", &[member("u9", true)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_user_rolls_back_team() {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("t.db")).await.unwrap();

        create_team_with_members(&pool, "core", &[member("u1", true)]).await.unwrap();
        let err = create_team_with_members(&pool, "infra", &[member("u2", true), member("u1", true)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        assert!(find_by_name(&pool, "infra").await.unwrap().is_none());
        assert!(any_user_exists(&pool, &["u1".into()]).await.unwrap());
        assert!(!any_user_exists(&pool, &["u2".into()]).await.unwrap());
    }
}
