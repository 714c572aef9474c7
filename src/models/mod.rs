//! Data models for the application.
//!
//! These models represent the core entities stored in the SQLite database.
//! Row types derive `FromRow` for SQLx queries and `Serialize` for the HTTP layer.

pub mod pull_request;
pub mod stats;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use pull_request::{AssignedReviewer, NewPullRequest, PullRequest, PullRequestStatus};
pub use stats::{AssignmentStats, PullRequestStats, ReviewPullRequest, ReviewerStats};
pub use team::{NewTeamMember, Team};
pub use user::User;
