//! Database queries for pull requests and reviewer slots.

use std::collections::HashMap;

use crate::db::pool::DbPool;
use crate::db::{placeholders, DbError};
use crate::models::{AssignedReviewer, NewPullRequest, PullRequest, PullRequestStatus};

const PULL_REQUEST_SELECT: &str = r#"
    SELECT pr.id, pr.pr_id AS pull_request_id, pr.title, pr.author_id,
           author.user_id AS author_user_id, pr.status, pr.created_at, pr.updated_at
    FROM pull_requests pr
    JOIN users author ON author.id = pr.author_id
"#;

/// Conflict label for a duplicate external pull request id.
pub const PULL_REQUEST_ID: &str = "pull request id";

/// Whether a pull request with this external id exists.
pub async fn exists(pool: &DbPool, pull_request_id: &str) -> Result<bool, DbError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pull_requests WHERE pr_id = ?)")
            .bind(pull_request_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert an OPEN pull request and its initial reviewers in one transaction.
///
/// `reviewer_refs[i]` takes slot `i + 1`. A duplicate external id is reported
/// as [`DbError::Conflict`] with `"pull request id"`; a rejected slot aborts
/// the whole insert, so no pull request is left half assigned.
pub async fn create(
    pool: &DbPool,
    input: &NewPullRequest,
    reviewer_refs: &[i64],
) -> Result<PullRequest, DbError> {
    let mut tx = pool.begin().await?;

    let (pr_ref,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO pull_requests (pr_id, title, author_id, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&input.pull_request_id)
    .bind(&input.title)
    .bind(input.author_id)
    .bind(PullRequestStatus::Open.as_str())
    .bind(input.created_at)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| DbError::from_write(e, PULL_REQUEST_ID))?;

    for (idx, reviewer_ref) in reviewer_refs.iter().enumerate() {
        sqlx::query(
            "INSERT INTO pr_reviews (pr_id, reviewer_id, slot, assigned_at) VALUES (?, ?, ?, ?)",
        )
        .bind(pr_ref)
        .bind(*reviewer_ref)
        .bind(idx as i64 + 1)
        .bind(input.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_write(e, "reviewer slot"))?;
    }

    tx.commit().await?;

    find_by_pr_id(pool, &input.pull_request_id)
        .await?
        .ok_or_else(|| DbError::NotFound(input.pull_request_id.clone()))
}

/// Fetch a pull request with its reviewers in slot order.
pub async fn find_by_pr_id(
    pool: &DbPool,
    pull_request_id: &str,
) -> Result<Option<PullRequest>, DbError> {
    let found = sqlx::query_as::<_, PullRequest>(&format!("{PULL_REQUEST_SELECT} WHERE pr.pr_id = ?"))
        .bind(pull_request_id)
        .fetch_optional(pool)
        .await?;

    let Some(mut pr) = found else {
        return Ok(None);
    };

    pr.reviewers = reviewers(pool, pr.id).await?;
    Ok(Some(pr))
}

/// Reviewers of a pull request, ordered by slot.
pub async fn reviewers(pool: &DbPool, pr_ref: i64) -> Result<Vec<AssignedReviewer>, DbError> {
    let rows = sqlx::query_as::<_, AssignedReviewer>(
        r#"
        SELECT r.reviewer_id AS user_ref, u.user_id, r.slot, u.is_active
        FROM pr_reviews r
        JOIN users u ON u.id = r.reviewer_id
        WHERE r.pr_id = ?
        ORDER BY r.slot
        "#,
    )
    .bind(pr_ref)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Set the status and update timestamp of a pull request.
pub async fn update_status(
    pool: &DbPool,
    pr_ref: i64,
    status: PullRequestStatus,
    updated_at: i64,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE pull_requests SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(updated_at)
        .bind(pr_ref)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("pull request {pr_ref}")));
    }
    Ok(())
}

/// Assign `reviewer_ref` to `slot`. Occupied slots and repeated reviewers are conflicts.
pub async fn insert_assignment(
    pool: &DbPool,
    pr_ref: i64,
    reviewer_ref: i64,
    slot: i64,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO pr_reviews (pr_id, reviewer_id, slot, assigned_at) VALUES (?, ?, ?, ?)")
        .bind(pr_ref)
        .bind(reviewer_ref)
        .bind(slot)
        .bind(crate::db::now())
        .execute(pool)
        .await
        .map_err(|e| DbError::from_write(e, "reviewer slot"))?;

    Ok(())
}

/// Remove a reviewer from a pull request.
pub async fn delete_assignment(pool: &DbPool, pr_ref: i64, reviewer_ref: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM pr_reviews WHERE pr_id = ? AND reviewer_id = ?")
        .bind(pr_ref)
        .bind(reviewer_ref)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound(format!("reviewer {reviewer_ref} on {pr_ref}")));
    }
    Ok(())
}

/// Swap the reviewer in `slot` from `old_ref` to `new_ref`.
///
/// A single conditional `UPDATE`, so the slot is never observed empty or
/// doubly occupied and a pull request merged in the meantime is left alone.
/// Fails with [`DbError::NotOpen`] when the pull request is no longer OPEN and
/// with [`DbError::NotFound`] when the (pull request, old reviewer, slot)
/// triple no longer exists.
pub async fn replace_assignment(
    pool: &DbPool,
    pr_ref: i64,
    old_ref: i64,
    new_ref: i64,
    slot: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE pr_reviews
        SET reviewer_id = ?, assigned_at = ?
        WHERE pr_id = ? AND reviewer_id = ? AND slot = ?
          AND EXISTS (SELECT 1 FROM pull_requests WHERE id = ? AND status = ?)
        "#,
    )
    .bind(new_ref)
    .bind(crate::db::now())
    .bind(pr_ref)
    .bind(old_ref)
    .bind(slot)
    .bind(pr_ref)
    .bind(PullRequestStatus::Open.as_str())
    .execute(pool)
    .await
    .map_err(|e| DbError::from_write(e, "reviewer already assigned"))?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let status: Option<(String,)> = sqlx::query_as("SELECT status FROM pull_requests WHERE id = ?")
        .bind(pr_ref)
        .fetch_optional(pool)
        .await?;
    match status {
        Some((status,)) if status != PullRequestStatus::Open.as_str() => {
            Err(DbError::NotOpen(format!("pull request {pr_ref}")))
        }
        _ => Err(DbError::NotFound(format!(
            "reviewer {old_ref} in slot {slot} of {pr_ref}"
        ))),
    }
}

/// Slot held by `reviewer_ref` on a pull request.
pub async fn reviewer_slot(
    pool: &DbPool,
    pr_ref: i64,
    reviewer_ref: i64,
) -> Result<Option<i64>, DbError> {
    let slot: Option<(i64,)> =
        sqlx::query_as("SELECT slot FROM pr_reviews WHERE pr_id = ? AND reviewer_id = ?")
            .bind(pr_ref)
            .bind(reviewer_ref)
            .fetch_optional(pool)
            .await?;

    Ok(slot.map(|(s,)| s))
}

/// OPEN pull requests where any of `reviewer_refs` holds a slot.
///
/// Each pull request carries its full reviewer list (not just the matching
/// reviewers), ordered by slot; pull requests are ordered by creation.
pub async fn open_with_reviewers(
    pool: &DbPool,
    reviewer_refs: &[i64],
) -> Result<Vec<PullRequest>, DbError> {
    if reviewer_refs.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        r#"{PULL_REQUEST_SELECT}
        WHERE pr.status = ?
          AND EXISTS (SELECT 1 FROM pr_reviews r WHERE r.pr_id = pr.id AND r.reviewer_id IN ({}))
        ORDER BY pr.id"#,
        placeholders(reviewer_refs.len())
    );
    let mut q = sqlx::query_as::<_, PullRequest>(&query).bind(PullRequestStatus::Open.as_str());
    for id in reviewer_refs {
        q = q.bind(*id);
    }

    let mut prs = q.fetch_all(pool).await?;
    if prs.is_empty() {
        return Ok(prs);
    }

    let query = format!(
        r#"
        SELECT r.pr_id, r.reviewer_id, u.user_id, r.slot, u.is_active
        FROM pr_reviews r
        JOIN users u ON u.id = r.reviewer_id
        WHERE r.pr_id IN ({})
        ORDER BY r.pr_id, r.slot
        "#,
        placeholders(prs.len())
    );
    let mut q = sqlx::query_as::<_, (i64, i64, String, i64, bool)>(&query);
    for pr in &prs {
        q = q.bind(pr.id);
    }

    let rows = q.fetch_all(pool).await?;

    let mut by_pr: HashMap<i64, Vec<AssignedReviewer>> = HashMap::new();
    for (pr_ref, user_ref, user_id, slot, is_active) in rows {
        by_pr.entry(pr_ref).or_default().push(AssignedReviewer {
            user_ref,
            user_id,
            slot,
            is_active,
        });
    }

    for pr in &mut prs {
        pr.reviewers = by_pr.remove(&pr.id).unwrap_or_default();
    }
    Ok(prs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::teams::create_team_with_members;
    use crate::db::users::find_by_user_id;
    use crate::models::NewTeamMember;
    use tempfile::tempdir;

    async fn setup(dir: &std::path::Path) -> (DbPool, Vec<i64>) {
        let pool = crate::db::initialize(&dir.join("pr.db")).await.unwrap();
        let members: Vec<NewTeamMember> = ["a", "b", "c"]
            .iter()
            .map(|id| NewTeamMember {
                user_id: id.to_string(),
                username: id.to_string(),
                is_active: true,
            })
            .collect();
        create_team_with_members(&pool, "core", &members).await.unwrap();

        let mut refs = Vec::new();
        for id in ["a", "b", "c"] {
            refs.push(find_by_user_id(&pool, id).await.unwrap().unwrap().id);
        }
        (pool, refs)
    }

    fn new_pr(id: &str, author: i64) -> NewPullRequest {
        NewPullRequest {
            pull_request_id: id.to_string(),
            title: format!("Title of {id}"),
            author_id: author,
            created_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_with_reviewers() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;

        let pr = create(&pool, &new_pr("pr-1", refs[0]), &[refs[1], refs[2]])
            .await
            .unwrap();
        assert_eq!(pr.author_user_id, "a");
        assert!(!pr.is_merged());
        assert_eq!(pr.reviewer_ids(), vec!["b", "c"]);

        let found = find_by_pr_id(&pool, "pr-1").await.unwrap().unwrap();
        assert_eq!(found.reviewer_ids(), vec!["b", "c"]);
        assert_eq!(reviewer_slot(&pool, pr.id, refs[2]).await.unwrap(), Some(2));

        let err = create(&pool, &new_pr("pr-1", refs[0]), &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref what) if what == PULL_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_a_slot_is_rejected() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;

        // Same reviewer twice: slot 2 violates UNIQUE(pr_id, reviewer_id).
        let err = create(&pool, &new_pr("pr-1", refs[0]), &[refs[1], refs[1]])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref what) if what == "reviewer slot"));
        assert!(!exists(&pool, "pr-1").await.unwrap());

        let retried = create(&pool, &new_pr("pr-1", refs[0]), &[refs[1], refs[2]])
            .await
            .unwrap();
        assert_eq!(retried.reviewer_ids(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_slot_and_reviewer_uniqueness() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;
        let pr = create(&pool, &new_pr("pr-1", refs[0]), &[]).await.unwrap();

        insert_assignment(&pool, pr.id, refs[1], 1).await.unwrap();
        let same_slot = insert_assignment(&pool, pr.id, refs[2], 1).await.unwrap_err();
        assert!(matches!(same_slot, DbError::Conflict(_)));
        let same_reviewer = insert_assignment(&pool, pr.id, refs[1], 2).await.unwrap_err();
        assert!(matches!(same_reviewer, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_keeps_slot_and_requires_exact_triple() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;
        let pr = create(&pool, &new_pr("pr-1", refs[0]), &[]).await.unwrap();
        insert_assignment(&pool, pr.id, refs[1], 1).await.unwrap();

        let wrong_slot = replace_assignment(&pool, pr.id, refs[1], refs[2], 2).await.unwrap_err();
        assert!(matches!(wrong_slot, DbError::NotFound(_)));

        replace_assignment(&pool, pr.id, refs[1], refs[2], 1).await.unwrap();
        let found = find_by_pr_id(&pool, "pr-1").await.unwrap().unwrap();
        assert_eq!(found.reviewers.len(), 1);
        assert_eq!(found.reviewers[0].user_id, "c");
        assert_eq!(found.reviewers[0].slot, 1);

        delete_assignment(&pool, pr.id, refs[2]).await.unwrap();
        assert!(reviewers(&pool, pr.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_refuses_merged_pull_request() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;
        let pr = create(&pool, &new_pr("pr-1", refs[0]), &[refs[1]]).await.unwrap();
        update_status(&pool, pr.id, PullRequestStatus::Merged, 1_700_000_100)
            .await
            .unwrap();

        let err = replace_assignment(&pool, pr.id, refs[1], refs[2], 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotOpen(_)));
        assert_eq!(
            find_by_pr_id(&pool, "pr-1").await.unwrap().unwrap().reviewer_ids(),
            vec!["b"]
        );
    }

    #[tokio::test]
    async fn test_open_with_reviewers_skips_merged() {
        let dir = tempdir().unwrap();
        let (pool, refs) = setup(dir.path()).await;

        let open = create(&pool, &new_pr("pr-open", refs[0]), &[]).await.unwrap();
        insert_assignment(&pool, open.id, refs[1], 1).await.unwrap();
        insert_assignment(&pool, open.id, refs[2], 2).await.unwrap();

        let merged = create(&pool, &new_pr("pr-merged", refs[0]), &[]).await.unwrap();
        insert_assignment(&pool, merged.id, refs[1], 1).await.unwrap();
        update_status(&pool, merged.id, PullRequestStatus::Merged, 1_700_000_100)
            .await
            .unwrap();

        let affected = open_with_reviewers(&pool, &[refs[1]]).await.unwrap();
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].pull_request_id, "pr-open");
        assert_eq!(affected[0].reviewer_ids(), vec!["b", "c"]);

        assert!(open_with_reviewers(&pool, &[]).await.unwrap().is_empty());
    }
}
