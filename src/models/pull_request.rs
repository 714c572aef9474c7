//! Pull request model and its reviewer assignments.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status of a pull request. `Open -> Merged` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl PullRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
        }
    }
}

impl From<&str> for PullRequestStatus {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "MERGED" => Self::Merged,
            _ => Self::Open,
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer holding a slot on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AssignedReviewer {
    /// Internal id of the reviewing user.
    pub user_ref: i64,

    /// External user identifier.
    pub user_id: String,

    /// 1-based position, preserved across replacement.
    pub slot: i64,

    pub is_active: bool,
}

/// A pull request together with its reviewers in slot order.
#[derive(Debug, Clone, FromRow)]
pub struct PullRequest {
    /// Internal row id.
    pub id: i64,

    /// External pull request identifier.
    pub pull_request_id: String,

    pub title: String,

    /// Internal id of the author.
    pub author_id: i64,

    /// External id of the author.
    pub author_user_id: String,

    /// Current status: `OPEN` or `MERGED`.
    pub status: String,

    /// Creation timestamp (Unix).
    pub created_at: i64,

    /// Last update timestamp (Unix), set on merge.
    pub updated_at: Option<i64>,

    #[sqlx(skip)]
    pub reviewers: Vec<AssignedReviewer>,
}

impl PullRequest {
    /// Parse the status string into an enum.
    pub fn status_enum(&self) -> PullRequestStatus {
        PullRequestStatus::from(self.status.as_str())
    }

    pub fn is_merged(&self) -> bool {
        self.status_enum() == PullRequestStatus::Merged
    }

    /// External ids of the reviewers, in slot order.
    pub fn reviewer_ids(&self) -> Vec<String> {
        self.reviewers.iter().map(|r| r.user_id.clone()).collect()
    }

    /// Find the assignment held by `user_id`, if any.
    pub fn reviewer(&self, user_id: &str) -> Option<&AssignedReviewer> {
        self.reviewers.iter().find(|r| r.user_id == user_id)
    }

    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.reviewer(user_id).is_some()
    }
}

/// Input for persisting a new pull request.
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub pull_request_id: String,
    pub title: String,
    pub author_id: i64,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr_with(reviewers: &[(&str, i64)]) -> PullRequest {
        PullRequest {
            id: 1,
            pull_request_id: "pr-1".into(),
            title: "Add thing".into(),
            author_id: 10,
            author_user_id: "author".into(),
            status: "OPEN".into(),
            created_at: 0,
            updated_at: None,
            reviewers: reviewers
                .iter()
                .enumerate()
                .map(|(i, (id, slot))| AssignedReviewer {
                    user_ref: 100 + i as i64,
                    user_id: (*id).into(),
                    slot: *slot,
                    is_active: true,
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(PullRequestStatus::from("OPEN"), PullRequestStatus::Open);
        assert_eq!(PullRequestStatus::from("merged"), PullRequestStatus::Merged);
        assert_eq!(PullRequestStatus::from("unknown"), PullRequestStatus::Open);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PullRequestStatus::Open.to_string(), "OPEN");
        assert_eq!(PullRequestStatus::Merged.to_string(), "MERGED");
    }

    #[test]
    fn test_reviewer_lookup() {
        let pr = pr_with(&[("u1", 1), ("u2", 2)]);
        assert_eq!(pr.reviewer_ids(), vec!["u1", "u2"]);
        assert_eq!(pr.reviewer("u2").map(|r| r.slot), Some(2));
        assert!(!pr.has_reviewer("author"));
        assert!(!pr.is_merged());
    }
}
