//! Read models for reviewer listings and assignment statistics.

use serde::Serialize;
use sqlx::FromRow;

/// A pull request as seen from one of its reviewers.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewPullRequest {
    pub pull_request_id: String,
    #[serde(rename = "pull_request_name")]
    pub title: String,
    #[serde(rename = "author_id")]
    pub author_user_id: String,
    pub status: String,
}

/// Per-reviewer assignment counters.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewerStats {
    pub user_id: String,
    pub username: String,
    pub assigned_count: i64,
    pub active_pr_count: i64,
    pub merged_pr_count: i64,
}

/// Per-pull-request reviewer count.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PullRequestStats {
    pub pull_request_id: String,
    pub title: String,
    pub reviewers_count: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentStats {
    pub reviewer_stats: Vec<ReviewerStats>,
    pub pr_stats: Vec<PullRequestStats>,
    pub total_assignments: i64,
}
