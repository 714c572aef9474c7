//! Reviewer assignment engine.
//!
//! Orchestrates the four reviewer-affecting operations on top of an
//! [`EntityStore`]:
//! - creation picks up to two random teammates of the author,
//! - merge is idempotent and never touches reviewers,
//! - reassignment swaps one reviewer for a random eligible teammate in place,
//! - bulk deactivation walks every affected open pull request and refills the
//!   vacated slots by round-robin, tolerating individual failures.
//!
//! Random picks and round-robin are kept as separate algorithms on purpose:
//! a bulk run must spread many replacements evenly, which independent random
//! draws do not guarantee.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::db::pull_requests::PULL_REQUEST_ID;
use crate::db::DbError;
use crate::error::AppError;
use crate::models::{AssignedReviewer, NewPullRequest, PullRequest, PullRequestStatus, User};
use crate::services::directory::MAX_TEAM_MEMBERS;
use crate::services::eligibility::{eligible, ExclusionSet};
use crate::services::guard;
use crate::services::rotation::RoundRobin;
use crate::services::selector::ReviewerSelector;
use crate::services::store::EntityStore;

/// Reviewers picked when a pull request is created.
pub const REVIEWERS_PER_PULL_REQUEST: usize = 2;

/// Upper bound on the ids accepted by one bulk deactivation. No team can hold more.
pub const MAX_BULK_USER_IDS: usize = MAX_TEAM_MEMBERS;

/// Outcome of a single manual reassignment.
#[derive(Debug, Clone)]
pub struct Reassignment {
    pub pull_request: PullRequest,
    /// External id of the reviewer who took over the slot.
    pub replaced_by: String,
}

/// Why a vacated slot was left with its deactivated reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The team has no active members left to rotate through.
    NoActiveTeammates,
    /// Every remaining teammate is the author or already reviews the pull request.
    NoEligibleCandidate,
    /// The write failed; `code` is the error's stable code.
    Failed { code: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReplacement {
    pub pull_request_id: String,
    pub reviewer_id: String,
    pub slot: i64,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Successful replacements on one pull request, old reviewer -> new reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReassignedPullRequest {
    pub pull_request_id: String,
    pub replacements: BTreeMap<String, String>,
}

/// Result of a bulk deactivation. Partial success is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeactivationReport {
    pub team_name: String,
    /// Users that flipped from active to inactive in this call.
    pub deactivated_users: Vec<String>,
    #[serde(rename = "reassigned_prs")]
    pub reassigned: Vec<ReassignedPullRequest>,
    #[serde(rename = "skipped_replacements")]
    pub skipped: Vec<SkippedReplacement>,
}

impl BulkDeactivationReport {
    fn skip(&mut self, pr: &PullRequest, held: &AssignedReviewer, reason: SkipReason) {
        self.skipped.push(SkippedReplacement {
            pull_request_id: pr.pull_request_id.clone(),
            reviewer_id: held.user_id.clone(),
            slot: held.slot,
            reason,
        });
    }

    /// Total number of slots that received a new reviewer.
    pub fn replacement_count(&self) -> usize {
        self.reassigned.iter().map(|r| r.replacements.len()).sum()
    }
}

/// Log a store failure and convert it into an `INTERNAL` error.
fn store_error(operation: &'static str) -> impl FnOnce(DbError) -> AppError {
    move |err| {
        log::error!("Store operation '{}' failed: {}", operation, err);
        AppError::database_with_op(err.to_string(), operation)
    }
}

/// Like [`store_error`], except that a slot swap refused because the pull
/// request was merged in the meantime surfaces as `PR_MERGED`.
fn replace_error(pull_request_id: &str) -> impl FnOnce(DbError) -> AppError + '_ {
    move |err| match err {
        DbError::NotOpen(_) => {
            log::warn!("{} was merged before its reviewer swap landed", pull_request_id);
            AppError::pr_merged(pull_request_id)
        }
        err => store_error("replace_review_assignment")(err),
    }
}

fn require(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation_field(format!("{field} is required"), field));
    }
    Ok(trimmed.to_string())
}

pub struct AssignmentEngine<S> {
    store: S,
    selector: ReviewerSelector,
}

impl<S: EntityStore> AssignmentEngine<S> {
    /// Engine with an entropy-seeded selector.
    pub fn new(store: S) -> Self {
        Self::with_selector(store, ReviewerSelector::from_entropy())
    }

    pub fn with_selector(store: S, selector: ReviewerSelector) -> Self {
        Self { store, selector }
    }

    /// Create an OPEN pull request and assign up to two reviewers from the
    /// author's team.
    ///
    /// Zero reviewers (author alone in the team, or every teammate inactive)
    /// is a valid outcome.
    pub async fn create_pull_request(
        &self,
        pull_request_id: &str,
        title: &str,
        author_id: &str,
    ) -> Result<PullRequest, AppError> {
        let pull_request_id = require(pull_request_id, "pull_request_id")?;
        let title = require(title, "pull_request_name")?;
        let author_id = require(author_id, "author_id")?;

        if self
            .store
            .pull_request_exists(&pull_request_id)
            .await
            .map_err(store_error("pull_request_exists"))?
        {
            return Err(AppError::pr_exists(pull_request_id));
        }

        let author = self
            .store
            .find_user(&author_id)
            .await
            .map_err(store_error("find_user"))?
            .ok_or_else(|| AppError::not_found_with_id("User", &author_id))?;

        let members = self
            .store
            .list_team_members(author.team_id)
            .await
            .map_err(store_error("list_team_members"))?;
        let candidates = eligible(&members, &ExclusionSet::single(&author.user_id));
        let chosen = self.selector.select(&candidates, REVIEWERS_PER_PULL_REQUEST);
        log::debug!(
            "{}: {} eligible reviewers, picked {}",
            pull_request_id,
            candidates.len(),
            chosen.len()
        );
        guard::ensure_initial_reviewers(&pull_request_id, &author, &chosen)?;

        let input = NewPullRequest {
            pull_request_id: pull_request_id.clone(),
            title,
            author_id: author.id,
            created_at: crate::db::now(),
        };
        let reviewer_refs: Vec<i64> = chosen.iter().map(|u| u.id).collect();
        let pr = match self.store.create_pull_request(input, &reviewer_refs).await {
            Ok(pr) => pr,
            // Lost a race against a concurrent create with the same id.
            Err(DbError::Conflict(what)) if what == PULL_REQUEST_ID => {
                return Err(AppError::pr_exists(pull_request_id))
            }
            Err(err) => return Err(store_error("create_pull_request")(err)),
        };

        log::info!(
            "Created {} by {} with reviewers {:?}",
            pr.pull_request_id,
            pr.author_user_id,
            pr.reviewer_ids()
        );
        Ok(pr)
    }

    /// Mark a pull request MERGED. Merging an already merged pull request
    /// returns it unchanged.
    pub async fn merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        let pull_request_id = require(pull_request_id, "pull_request_id")?;
        let mut pr = self.find_pull_request(&pull_request_id).await?;

        if pr.is_merged() {
            return Ok(pr);
        }

        let now = crate::db::now();
        self.store
            .update_pull_request_status(pr.id, PullRequestStatus::Merged, now)
            .await
            .map_err(store_error("update_pull_request_status"))?;

        pr.status = PullRequestStatus::Merged.to_string();
        pr.updated_at = Some(now);
        log::info!("Merged {}", pr.pull_request_id);
        Ok(pr)
    }

    /// Replace `old_reviewer_id` on an open pull request with a random
    /// eligible teammate of the old reviewer, keeping the slot.
    pub async fn reassign_reviewer(
        &self,
        pull_request_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        let pull_request_id = require(pull_request_id, "pull_request_id")?;
        let old_reviewer_id = require(old_reviewer_id, "old_reviewer_id")?;

        let mut pr = self.find_pull_request(&pull_request_id).await?;
        guard::ensure_open(&pr)?;
        let held = pr
            .reviewer(&old_reviewer_id)
            .cloned()
            .ok_or_else(|| AppError::not_assigned(&pull_request_id, &old_reviewer_id))?;

        let old_reviewer = self
            .store
            .find_user_by_ref(held.user_ref)
            .await
            .map_err(store_error("find_user_by_ref"))?
            .ok_or_else(|| AppError::not_found_with_id("User", &old_reviewer_id))?;

        let members = self
            .store
            .list_team_members(old_reviewer.team_id)
            .await
            .map_err(store_error("list_team_members"))?;

        let mut excluded = ExclusionSet::many(pr.reviewer_ids());
        excluded.insert(&pr.author_user_id);
        let candidates = eligible(&members, &excluded);
        let new_reviewer: User = self
            .selector
            .select(&candidates, 1)
            .into_iter()
            .next()
            .cloned()
            .ok_or_else(|| AppError::no_candidate(&pull_request_id))?;

        let slot = self
            .store
            .get_reviewer_slot(pr.id, old_reviewer.id)
            .await
            .map_err(store_error("get_reviewer_slot"))?
            .ok_or_else(|| AppError::not_assigned(&pull_request_id, &old_reviewer_id))?;

        guard::check_replacement(&pr, &old_reviewer, &new_reviewer, slot)?;

        self.store
            .replace_review_assignment(pr.id, old_reviewer.id, new_reviewer.id, slot)
            .await
            .map_err(replace_error(&pull_request_id))?;

        replace_locally(&mut pr, slot, &new_reviewer);
        log::info!(
            "Reassigned {} slot {}: {} -> {}",
            pr.pull_request_id,
            slot,
            old_reviewer.user_id,
            new_reviewer.user_id
        );

        Ok(Reassignment {
            pull_request: pr,
            replaced_by: new_reviewer.user_id,
        })
    }

    /// Deactivate members of `team_name` and refill their reviewer slots on
    /// open pull requests.
    ///
    /// Best effort: each slot is replaced independently and failures are
    /// reported in [`BulkDeactivationReport::skipped`] instead of aborting.
    pub async fn bulk_deactivate(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<BulkDeactivationReport, AppError> {
        let team_name = require(team_name, "team_name")?;
        if user_ids.len() > MAX_BULK_USER_IDS {
            return Err(AppError::validation_field(
                format!("at most {MAX_BULK_USER_IDS} user_ids per request"),
                "user_ids",
            ));
        }
        let team = self
            .store
            .find_team(&team_name)
            .await
            .map_err(store_error("find_team"))?
            .ok_or_else(|| AppError::not_found_with_id("Team", &team_name))?;

        let deactivated = self
            .store
            .bulk_deactivate_users(team.id, user_ids)
            .await
            .map_err(store_error("bulk_deactivate_users"))?;

        let mut report = BulkDeactivationReport {
            team_name: team.name.clone(),
            deactivated_users: deactivated.iter().map(|u| u.user_id.clone()).collect(),
            ..Default::default()
        };
        if deactivated.is_empty() {
            log::info!("Bulk deactivation in {}: nothing to deactivate", team.name);
            return Ok(report);
        }

        let refs: Vec<i64> = deactivated.iter().map(|u| u.id).collect();
        let by_ref: HashMap<i64, &User> = deactivated.iter().map(|u| (u.id, u)).collect();

        let affected = self
            .store
            .list_open_pull_requests_with_reviewers(&refs)
            .await
            .map_err(store_error("list_open_pull_requests_with_reviewers"))?;
        let mut pool = self
            .store
            .list_active_users_excluding(team.id, &refs)
            .await
            .map_err(store_error("list_active_users_excluding"))?;
        self.selector.shuffle(&mut pool);
        let mut rotation = RoundRobin::new(&pool);

        for mut pr in affected {
            let vacated: Vec<AssignedReviewer> = pr
                .reviewers
                .iter()
                .filter(|r| by_ref.contains_key(&r.user_ref))
                .cloned()
                .collect();

            if rotation.is_empty() {
                for held in &vacated {
                    report.skip(&pr, held, SkipReason::NoActiveTeammates);
                }
                continue;
            }

            let mut replacements = BTreeMap::new();
            for held in vacated {
                let replaced = by_ref[&held.user_ref];
                let candidate = rotation
                    .next_matching(|c| c.id != pr.author_id && !pr.has_reviewer(&c.user_id));
                let Some(candidate) = candidate else {
                    log::warn!(
                        "No eligible replacement for {} on {}",
                        held.user_id,
                        pr.pull_request_id
                    );
                    report.skip(&pr, &held, SkipReason::NoEligibleCandidate);
                    continue;
                };

                match self.replace_in_slot(&pr, replaced, candidate, held.slot).await {
                    Ok(()) => {
                        replace_locally(&mut pr, held.slot, candidate);
                        replacements.insert(held.user_id.clone(), candidate.user_id.clone());
                    }
                    Err(err) => {
                        log::warn!(
                            "Skipping replacement of {} on {}: {}",
                            held.user_id,
                            pr.pull_request_id,
                            err
                        );
                        report.skip(
                            &pr,
                            &held,
                            SkipReason::Failed {
                                code: err.code().to_string(),
                            },
                        );
                    }
                }
            }

            if !replacements.is_empty() {
                report.reassigned.push(ReassignedPullRequest {
                    pull_request_id: pr.pull_request_id.clone(),
                    replacements,
                });
            }
        }

        log::info!(
            "Bulk deactivation in {}: {} users deactivated, {} slots reassigned, {} skipped",
            report.team_name,
            report.deactivated_users.len(),
            report.replacement_count(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn find_pull_request(&self, pull_request_id: &str) -> Result<PullRequest, AppError> {
        self.store
            .find_pull_request(pull_request_id)
            .await
            .map_err(store_error("find_pull_request"))?
            .ok_or_else(|| AppError::not_found_with_id("PullRequest", pull_request_id))
    }

    async fn replace_in_slot(
        &self,
        pr: &PullRequest,
        replaced: &User,
        candidate: &User,
        slot: i64,
    ) -> Result<(), AppError> {
        guard::check_replacement(pr, replaced, candidate, slot)?;
        self.store
            .replace_review_assignment(pr.id, replaced.id, candidate.id, slot)
            .await
            .map_err(replace_error(&pr.pull_request_id))
    }
}

/// Mirror a successful slot swap on the in-memory pull request.
fn replace_locally(pr: &mut PullRequest, slot: i64, reviewer: &User) {
    if let Some(entry) = pr.reviewers.iter_mut().find(|r| r.slot == slot) {
        entry.user_ref = reviewer.id;
        entry.user_id = reviewer.user_id.clone();
        entry.is_active = reviewer.is_active;
    }
}
