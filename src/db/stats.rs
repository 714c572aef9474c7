//! Aggregate queries over reviewer assignments.

use crate::db::pool::DbPool;
use crate::db::DbError;
use crate::models::{PullRequestStats, ReviewerStats};

/// Assignment counters for every user, busiest first.
pub async fn reviewer_stats(pool: &DbPool) -> Result<Vec<ReviewerStats>, DbError> {
    let stats = sqlx::query_as::<_, ReviewerStats>(
        r#"
        SELECT
            u.user_id,
            u.username,
            COUNT(pr.id) AS assigned_count,
            COUNT(CASE WHEN pr.status = 'OPEN' THEN 1 END) AS active_pr_count,
            COUNT(CASE WHEN pr.status = 'MERGED' THEN 1 END) AS merged_pr_count
        FROM users u
        LEFT JOIN pr_reviews r ON r.reviewer_id = u.id
        LEFT JOIN pull_requests pr ON pr.id = r.pr_id
        GROUP BY u.id, u.user_id, u.username
        ORDER BY assigned_count DESC, u.user_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(stats)
}

/// Reviewer count per pull request.
pub async fn pull_request_stats(pool: &DbPool) -> Result<Vec<PullRequestStats>, DbError> {
    let stats = sqlx::query_as::<_, PullRequestStats>(
        r#"
        SELECT
            pr.pr_id AS pull_request_id,
            pr.title,
            COUNT(r.reviewer_id) AS reviewers_count,
            pr.status
        FROM pull_requests pr
        LEFT JOIN pr_reviews r ON r.pr_id = pr.id
        GROUP BY pr.id, pr.pr_id, pr.title, pr.status
        ORDER BY reviewers_count DESC, pr.pr_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(stats)
}

/// Total number of reviewer slots in use.
pub async fn total_assignments(pool: &DbPool) -> Result<i64, DbError> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pr_reviews")
        .fetch_one(pool)
        .await?;

    Ok(total)
}
