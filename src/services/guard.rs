//! Consistency rules checked before any reviewer write.
//!
//! Each rule is a plain function so the engine can apply exactly the ones a
//! write needs, and so they can be tested without a store.

use crate::error::AppError;
use crate::models::{PullRequest, User};

/// Reviewer mutations are only allowed on OPEN pull requests.
pub fn ensure_open(pr: &PullRequest) -> Result<(), AppError> {
    if pr.is_merged() {
        return Err(AppError::pr_merged(&pr.pull_request_id));
    }
    Ok(())
}

/// The author never reviews their own pull request.
pub fn ensure_not_author(pr: &PullRequest, candidate: &User) -> Result<(), AppError> {
    if candidate.id == pr.author_id || candidate.user_id == pr.author_user_id {
        return Err(AppError::internal(format!(
            "refusing self-review of {} by {}",
            pr.pull_request_id, candidate.user_id
        )));
    }
    Ok(())
}

/// A reviewer holds at most one slot per pull request.
pub fn ensure_not_assigned(pr: &PullRequest, candidate: &User) -> Result<(), AppError> {
    if pr.has_reviewer(&candidate.user_id) {
        return Err(AppError::internal(format!(
            "{} already reviews {}",
            candidate.user_id, pr.pull_request_id
        )));
    }
    Ok(())
}

/// Replacements stay inside the replaced reviewer's team.
pub fn ensure_same_team(replaced: &User, candidate: &User) -> Result<(), AppError> {
    if replaced.team_id != candidate.team_id {
        return Err(AppError::internal(format!(
            "cross-team replacement of {} by {}",
            replaced.user_id, candidate.user_id
        )));
    }
    Ok(())
}

/// The slot written must be the slot the replaced reviewer held.
pub fn ensure_slot_kept(pr: &PullRequest, replaced_user_id: &str, slot: i64) -> Result<(), AppError> {
    match pr.reviewer(replaced_user_id) {
        Some(current) if current.slot == slot => Ok(()),
        Some(current) => Err(AppError::internal(format!(
            "slot mismatch for {} on {}: held {}, writing {}",
            replaced_user_id, pr.pull_request_id, current.slot, slot
        ))),
        None => Err(AppError::not_assigned(&pr.pull_request_id, replaced_user_id)),
    }
}

/// Initial reviewers exclude the author and never repeat.
pub fn ensure_initial_reviewers(
    pull_request_id: &str,
    author: &User,
    chosen: &[&User],
) -> Result<(), AppError> {
    for (idx, reviewer) in chosen.iter().enumerate() {
        if reviewer.id == author.id {
            return Err(AppError::internal(format!(
                "refusing self-review of {} by {}",
                pull_request_id, reviewer.user_id
            )));
        }
        if chosen[..idx].iter().any(|earlier| earlier.id == reviewer.id) {
            return Err(AppError::internal(format!(
                "{} picked twice for {}",
                reviewer.user_id, pull_request_id
            )));
        }
    }
    Ok(())
}

/// All rules for putting `candidate` in place of `replaced` at `slot`.
pub fn check_replacement(
    pr: &PullRequest,
    replaced: &User,
    candidate: &User,
    slot: i64,
) -> Result<(), AppError> {
    ensure_open(pr)?;
    ensure_slot_kept(pr, &replaced.user_id, slot)?;
    ensure_not_author(pr, candidate)?;
    ensure_not_assigned(pr, candidate)?;
    ensure_same_team(replaced, candidate)
}
