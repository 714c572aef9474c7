//! Storage interface consumed by the assignment engine.
//!
//! The engine keeps no domain state of its own; everything it reads or writes
//! goes through this trait. [`crate::db::store::SqliteStore`] is the production
//! implementation.

use std::future::Future;

use crate::db::DbError;
use crate::models::{NewPullRequest, PullRequest, PullRequestStatus, Team, User};

pub type StoreResult<T> = Result<T, DbError>;

pub trait EntityStore: Send + Sync {
    /// Look up a user by external id.
    fn find_user(&self, user_id: &str) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Look up a user by internal id.
    fn find_user_by_ref(&self, id: i64) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    fn find_team(&self, team_name: &str) -> impl Future<Output = StoreResult<Option<Team>>> + Send;

    /// Every member of a team regardless of the active flag.
    fn list_team_members(&self, team_id: i64) -> impl Future<Output = StoreResult<Vec<User>>> + Send;

    fn pull_request_exists(
        &self,
        pull_request_id: &str,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Persist an OPEN pull request together with its initial reviewers
    /// (`reviewer_refs[i]` in slot `i + 1`), all or nothing.
    ///
    /// A duplicate id yields [`DbError::Conflict`] carrying
    /// [`crate::db::pull_requests::PULL_REQUEST_ID`].
    fn create_pull_request(
        &self,
        input: NewPullRequest,
        reviewer_refs: &[i64],
    ) -> impl Future<Output = StoreResult<PullRequest>> + Send;

    /// Pull request with reviewers in slot order.
    fn find_pull_request(
        &self,
        pull_request_id: &str,
    ) -> impl Future<Output = StoreResult<Option<PullRequest>>> + Send;

    fn update_pull_request_status(
        &self,
        pr_ref: i64,
        status: PullRequestStatus,
        updated_at: i64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn insert_review_assignment(
        &self,
        pr_ref: i64,
        reviewer_ref: i64,
        slot: i64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_review_assignment(
        &self,
        pr_ref: i64,
        reviewer_ref: i64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Atomically move `slot` from `old_ref` to `new_ref` on an OPEN pull request.
    ///
    /// Returns [`DbError::NotOpen`] if the pull request has been merged and
    /// [`DbError::NotFound`] if the (pull request, old reviewer, slot) triple
    /// is absent.
    fn replace_review_assignment(
        &self,
        pr_ref: i64,
        old_ref: i64,
        new_ref: i64,
        slot: i64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn get_reviewer_slot(
        &self,
        pr_ref: i64,
        reviewer_ref: i64,
    ) -> impl Future<Output = StoreResult<Option<i64>>> + Send;

    /// Deactivate the active team members among `user_ids`; returns those that flipped.
    fn bulk_deactivate_users(
        &self,
        team_id: i64,
        user_ids: &[String],
    ) -> impl Future<Output = StoreResult<Vec<User>>> + Send;

    /// OPEN pull requests reviewed by any of `reviewer_refs`, with full reviewer lists.
    fn list_open_pull_requests_with_reviewers(
        &self,
        reviewer_refs: &[i64],
    ) -> impl Future<Output = StoreResult<Vec<PullRequest>>> + Send;

    fn list_active_users_excluding(
        &self,
        team_id: i64,
        excluded_refs: &[i64],
    ) -> impl Future<Output = StoreResult<Vec<User>>> + Send;
}
