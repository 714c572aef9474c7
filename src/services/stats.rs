//! Assignment statistics.

use crate::db::pool::DbPool;
use crate::db::stats;
use crate::error::AppError;
use crate::models::AssignmentStats;

/// Reviewer load, per pull request reviewer counts, and the total number of
/// assignments.
pub async fn assignment_stats(pool: &DbPool) -> Result<AssignmentStats, AppError> {
    let reviewer_stats = stats::reviewer_stats(pool).await?;
    let pr_stats = stats::pull_request_stats(pool).await?;
    let total_assignments = stats::total_assignments(pool).await?;

    Ok(AssignmentStats {
        reviewer_stats,
        pr_stats,
        total_assignments,
    })
}
