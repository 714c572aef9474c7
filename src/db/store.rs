//! SQLite implementation of [`EntityStore`].

use crate::db::pool::DbPool;
use crate::db::{pull_requests, teams, users};
use crate::models::{NewPullRequest, PullRequest, PullRequestStatus, Team, User};
use crate::services::store::{EntityStore, StoreResult};

/// Entity store backed by the shared SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl EntityStore for SqliteStore {
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        users::find_by_user_id(&self.pool, user_id).await
    }

    async fn find_user_by_ref(&self, id: i64) -> StoreResult<Option<User>> {
        users::find_by_id(&self.pool, id).await
    }

    async fn find_team(&self, team_name: &str) -> StoreResult<Option<Team>> {
        teams::find_by_name(&self.pool, team_name).await
    }

    async fn list_team_members(&self, team_id: i64) -> StoreResult<Vec<User>> {
        users::list_team_members(&self.pool, team_id).await
    }

    async fn pull_request_exists(&self, pull_request_id: &str) -> StoreResult<bool> {
        pull_requests::exists(&self.pool, pull_request_id).await
    }

    async fn create_pull_request(
        &self,
        input: NewPullRequest,
        reviewer_refs: &[i64],
    ) -> StoreResult<PullRequest> {
        pull_requests::create(&self.pool, &input, reviewer_refs).await
    }

    async fn find_pull_request(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>> {
        pull_requests::find_by_pr_id(&self.pool, pull_request_id).await
    }

    async fn update_pull_request_status(
        &self,
        pr_ref: i64,
        status: PullRequestStatus,
        updated_at: i64,
    ) -> StoreResult<()> {
        pull_requests::update_status(&self.pool, pr_ref, status, updated_at).await
    }

    async fn insert_review_assignment(
        &self,
        pr_ref: i64,
        reviewer_ref: i64,
        slot: i64,
    ) -> StoreResult<()> {
        pull_requests::insert_assignment(&self.pool, pr_ref, reviewer_ref, slot).await
    }

    async fn delete_review_assignment(&self, pr_ref: i64, reviewer_ref: i64) -> StoreResult<()> {
        pull_requests::delete_assignment(&self.pool, pr_ref, reviewer_ref).await
    }

    async fn replace_review_assignment(
        &self,
        pr_ref: i64,
        old_ref: i64,
        new_ref: i64,
        slot: i64,
    ) -> StoreResult<()> {
        pull_requests::replace_assignment(&self.pool, pr_ref, old_ref, new_ref, slot).await
    }

    async fn get_reviewer_slot(&self, pr_ref: i64, reviewer_ref: i64) -> StoreResult<Option<i64>> {
        pull_requests::reviewer_slot(&self.pool, pr_ref, reviewer_ref).await
    }

    async fn bulk_deactivate_users(
        &self,
        team_id: i64,
        user_ids: &[String],
    ) -> StoreResult<Vec<User>> {
        users::bulk_deactivate(&self.pool, team_id, user_ids).await
    }

    async fn list_open_pull_requests_with_reviewers(
        &self,
        reviewer_refs: &[i64],
    ) -> StoreResult<Vec<PullRequest>> {
        pull_requests::open_with_reviewers(&self.pool, reviewer_refs).await
    }

    async fn list_active_users_excluding(
        &self,
        team_id: i64,
        excluded_refs: &[i64],
    ) -> StoreResult<Vec<User>> {
        users::list_active_excluding(&self.pool, team_id, excluded_refs).await
    }
}
