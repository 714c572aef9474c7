//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use pr_assign_lib::db::pool::DbPool;
use pr_assign_lib::db::store::SqliteStore;
use pr_assign_lib::db::{self, pull_requests, users, DbError};
use pr_assign_lib::models::{NewPullRequest, NewTeamMember, PullRequest, PullRequestStatus, Team, User};
use pr_assign_lib::services::directory;
use pr_assign_lib::services::store::{EntityStore, StoreResult};
use tempfile::TempDir;

/// Fresh migrated database in its own temp directory.
///
/// Keep the `TempDir` alive for the duration of the test.
pub async fn setup_db() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::initialize(&dir.path().join("test.db")).await.unwrap();
    (dir, pool)
}

pub fn member(user_id: &str, is_active: bool) -> NewTeamMember {
    NewTeamMember {
        user_id: user_id.to_string(),
        username: format!("{user_id}-name"),
        is_active,
    }
}

/// Create a team whose members are all active.
pub async fn add_team(pool: &DbPool, team_name: &str, user_ids: &[&str]) {
    let members: Vec<NewTeamMember> = user_ids.iter().map(|id| member(id, true)).collect();
    directory::add_team(pool, team_name, &members).await.unwrap();
}

/// Insert an OPEN pull request with exactly the given reviewers, in slot order.
///
/// Bypasses random selection so bulk scenarios start from a known state.
pub async fn seed_pull_request(
    pool: &DbPool,
    pull_request_id: &str,
    author: &str,
    reviewers: &[&str],
) -> PullRequest {
    let author = users::find_by_user_id(pool, author).await.unwrap().unwrap();
    let mut reviewer_refs = Vec::new();
    for reviewer in reviewers {
        reviewer_refs.push(users::find_by_user_id(pool, reviewer).await.unwrap().unwrap().id);
    }

    pull_requests::create(
        pool,
        &NewPullRequest {
            pull_request_id: pull_request_id.to_string(),
            title: format!("Change {pull_request_id}"),
            author_id: author.id,
            created_at: db::now(),
        },
        &reviewer_refs,
    )
    .await
    .unwrap()
}

pub async fn load(pool: &DbPool, pull_request_id: &str) -> PullRequest {
    pull_requests::find_by_pr_id(pool, pull_request_id)
        .await
        .unwrap()
        .unwrap()
}

/// Reviewer ids of a pull request in slot order.
pub async fn reviewers_of(pool: &DbPool, pull_request_id: &str) -> Vec<String> {
    load(pool, pull_request_id).await.reviewer_ids()
}

/// Misbehaviour injected by [`FaultyStore`].
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Every slot swap on this pull request fails.
    RejectSwaps { pr_ref: i64 },
    /// A concurrent merge of this pull request lands right after the engine
    /// looks up a reviewer slot.
    MergeAfterSlotLookup { pr_ref: i64 },
    /// A concurrent merge of this pull request lands right after the engine
    /// lists the replacement pool of a bulk deactivation.
    MergeAfterPoolListing { pr_ref: i64 },
    /// The first picked reviewer is written to every initial slot.
    RepeatFirstReviewer,
}

/// SQLite store with one injected fault; everything else is delegated.
pub struct FaultyStore {
    inner: SqliteStore,
    pool: DbPool,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(pool: &DbPool, fault: Fault) -> Self {
        Self {
            inner: SqliteStore::new(pool.clone()),
            pool: pool.clone(),
            fault,
        }
    }

    async fn merge(&self, pr_ref: i64) {
        pull_requests::update_status(&self.pool, pr_ref, PullRequestStatus::Merged, db::now())
            .await
            .unwrap();
    }
}

impl EntityStore for FaultyStore {
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        self.inner.find_user(user_id).await
    }

    async fn find_user_by_ref(&self, id: i64) -> StoreResult<Option<User>> {
        self.inner.find_user_by_ref(id).await
    }

    async fn find_team(&self, team_name: &str) -> StoreResult<Option<Team>> {
        self.inner.find_team(team_name).await
    }

    async fn list_team_members(&self, team_id: i64) -> StoreResult<Vec<User>> {
        self.inner.list_team_members(team_id).await
    }

    async fn pull_request_exists(&self, pull_request_id: &str) -> StoreResult<bool> {
        self.inner.pull_request_exists(pull_request_id).await
    }

    async fn create_pull_request(
        &self,
        input: NewPullRequest,
        reviewer_refs: &[i64],
    ) -> StoreResult<PullRequest> {
        match (self.fault, reviewer_refs.first()) {
            (Fault::RepeatFirstReviewer, Some(first)) => {
                let repeated = vec![*first; reviewer_refs.len().max(2)];
                self.inner.create_pull_request(input, &repeated).await
            }
            _ => self.inner.create_pull_request(input, reviewer_refs).await,
        }
    }

    async fn find_pull_request(&self, pull_request_id: &str) -> StoreResult<Option<PullRequest>> {
        self.inner.find_pull_request(pull_request_id).await
    }

    async fn update_pull_request_status(
        &self,
        pr_ref: i64,
        status: PullRequestStatus,
        updated_at: i64,
    ) -> StoreResult<()> {
        self.inner
            .update_pull_request_status(pr_ref, status, updated_at)
            .await
    }

    async fn insert_review_assignment(
        &self,
        pr_ref: i64,
        reviewer_ref: i64,
        slot: i64,
    ) -> StoreResult<()> {
        self.inner
            .insert_review_assignment(pr_ref, reviewer_ref, slot)
            .await
    }

    async fn delete_review_assignment(&self, pr_ref: i64, reviewer_ref: i64) -> StoreResult<()> {
        self.inner.delete_review_assignment(pr_ref, reviewer_ref).await
    }

    async fn replace_review_assignment(
        &self,
        pr_ref: i64,
        old_ref: i64,
        new_ref: i64,
        slot: i64,
    ) -> StoreResult<()> {
        if let Fault::RejectSwaps { pr_ref: broken } = self.fault {
            if broken == pr_ref {
                return Err(DbError::NotFound(format!("slot {slot} of {pr_ref}")));
            }
        }
        self.inner
            .replace_review_assignment(pr_ref, old_ref, new_ref, slot)
            .await
    }

    async fn get_reviewer_slot(&self, pr_ref: i64, reviewer_ref: i64) -> StoreResult<Option<i64>> {
        let slot = self.inner.get_reviewer_slot(pr_ref, reviewer_ref).await;
        if let Fault::MergeAfterSlotLookup { pr_ref: target } = self.fault {
            if target == pr_ref {
                self.merge(target).await;
            }
        }
        slot
    }

    async fn bulk_deactivate_users(
        &self,
        team_id: i64,
        user_ids: &[String],
    ) -> StoreResult<Vec<User>> {
        self.inner.bulk_deactivate_users(team_id, user_ids).await
    }

    async fn list_open_pull_requests_with_reviewers(
        &self,
        reviewer_refs: &[i64],
    ) -> StoreResult<Vec<PullRequest>> {
        self.inner
            .list_open_pull_requests_with_reviewers(reviewer_refs)
            .await
    }

    async fn list_active_users_excluding(
        &self,
        team_id: i64,
        excluded_refs: &[i64],
    ) -> StoreResult<Vec<User>> {
        let users = self.inner.list_active_users_excluding(team_id, excluded_refs).await;
        if let Fault::MergeAfterPoolListing { pr_ref } = self.fault {
            self.merge(pr_ref).await;
        }
        users
    }
}
