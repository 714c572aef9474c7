//! REST API routes.
//!
//! Thin JSON handlers over the assignment engine and the directory services.
//! Request bodies default missing fields to empty strings so the domain
//! validation, not the JSON extractor, decides what is required.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::db::pool::DbPool;
use crate::db::store::SqliteStore;
use crate::error::AppError;
use crate::models::{AssignmentStats, NewTeamMember, PullRequest, ReviewPullRequest, User};
use crate::services::assignment::{AssignmentEngine, BulkDeactivationReport};
use crate::services::directory::{self, TeamRoster};
use crate::services::selector::ReviewerSelector;
use crate::services::stats;

/// Shared state for the axum routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub engine: Arc<AssignmentEngine<SqliteStore>>,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self::with_selector(db, ReviewerSelector::from_entropy())
    }

    /// State whose engine draws from the given selector (seeded in tests).
    pub fn with_selector(db: DbPool, selector: ReviewerSelector) -> Self {
        let engine = AssignmentEngine::with_selector(SqliteStore::new(db.clone()), selector);
        Self {
            db,
            engine: Arc::new(engine),
        }
    }
}

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation { .. } | AppError::TeamExists { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::PrExists { .. }
            | AppError::PrMerged { .. }
            | AppError::NotAssigned { .. }
            | AppError::NoCandidate { .. } => StatusCode::CONFLICT,
            AppError::Database { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_internal() {
            log::error!("Request failed: {}", self.0);
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.0.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiErr> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiErr(AppError::validation(rejection.body_text())))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiErr> {
    params
        .map(|Query(query)| query)
        .map_err(|rejection| ApiErr(AppError::validation(rejection.body_text())))
}

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct AddTeamRequest {
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    members: Vec<NewTeamMember>,
}

#[derive(Serialize)]
struct TeamResponse {
    team: TeamRoster,
}

#[derive(Deserialize)]
struct TeamQuery {
    #[serde(default)]
    team_name: String,
}

#[derive(Deserialize)]
struct BulkDeactivateRequest {
    #[serde(default)]
    team_name: String,
    #[serde(default)]
    user_ids: Vec<String>,
}

#[derive(Deserialize)]
struct SetIsActiveRequest {
    #[serde(default)]
    user_id: String,
    is_active: bool,
}

#[derive(Serialize)]
struct UserDto {
    user_id: String,
    username: String,
    team_name: String,
    is_active: bool,
}

#[derive(Serialize)]
struct UserResponse {
    user: UserDto,
}

#[derive(Deserialize)]
struct UserQuery {
    #[serde(default)]
    user_id: String,
}

#[derive(Serialize)]
struct ReviewListResponse {
    user_id: String,
    pull_requests: Vec<ReviewPullRequest>,
}

#[derive(Deserialize)]
struct CreatePullRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    pull_request_name: String,
    #[serde(default)]
    author_id: String,
}

#[derive(Deserialize)]
struct MergePullRequest {
    #[serde(default)]
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    #[serde(default)]
    pull_request_id: String,
    #[serde(default)]
    old_reviewer_id: String,
}

#[derive(Serialize)]
struct PullRequestDto {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
    assigned_reviewers: Vec<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for PullRequestDto {
    fn from(pr: PullRequest) -> Self {
        Self {
            assigned_reviewers: pr.reviewer_ids(),
            created_at: DateTime::from_timestamp(pr.created_at, 0),
            merged_at: pr.updated_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.title,
            author_id: pr.author_user_id,
            status: pr.status,
        }
    }
}

#[derive(Serialize)]
struct PullRequestResponse {
    pr: PullRequestDto,
}

#[derive(Serialize)]
struct ReassignResponse {
    pr: PullRequestDto,
    replaced_by: String,
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Build the full API router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/team/add", post(add_team))
        .route("/team/get", get(get_team))
        .route("/team/bulkDeactivate", post(bulk_deactivate))
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_review))
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_reviewer))
        .route("/stats/assignments", get(get_assignment_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /team/add: create a team with members.
async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<AddTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let req = json_body(payload)?;
    let team = directory::add_team(&state.db, &req.team_name, &req.members).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=X: team with members.
async fn get_team(
    State(state): State<AppState>,
    params: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<TeamResponse>, ApiErr> {
    let query = query_params(params)?;
    let team = directory::get_team(&state.db, &query.team_name).await?;
    Ok(Json(TeamResponse { team }))
}

/// POST /team/bulkDeactivate: deactivate members and reassign their reviews.
async fn bulk_deactivate(
    State(state): State<AppState>,
    payload: Result<Json<BulkDeactivateRequest>, JsonRejection>,
) -> Result<Json<BulkDeactivationReport>, ApiErr> {
    let req = json_body(payload)?;
    let report = state
        .engine
        .bulk_deactivate(&req.team_name, &req.user_ids)
        .await?;
    Ok(Json(report))
}

/// POST /users/setIsActive: toggle one user's active flag.
async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let req = json_body(payload)?;
    let (user, team_name): (User, String) =
        directory::set_user_active(&state.db, &req.user_id, req.is_active).await?;
    Ok(Json(UserResponse {
        user: UserDto {
            user_id: user.user_id,
            username: user.username,
            team_name,
            is_active: user.is_active,
        },
    }))
}

/// GET /users/getReview?user_id=X: pull requests the user reviews.
async fn get_review(
    State(state): State<AppState>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<ReviewListResponse>, ApiErr> {
    let query = query_params(params)?;
    let pull_requests = directory::reviews_for_user(&state.db, &query.user_id).await?;
    Ok(Json(ReviewListResponse {
        user_id: query.user_id.trim().to_string(),
        pull_requests,
    }))
}

/// POST /pullRequest/create: create and auto-assign reviewers.
async fn create_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<CreatePullRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequestResponse>), ApiErr> {
    let req = json_body(payload)?;
    let pr = state
        .engine
        .create_pull_request(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PullRequestResponse { pr: pr.into() }),
    ))
}

/// POST /pullRequest/merge: idempotent merge.
async fn merge_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<MergePullRequest>, JsonRejection>,
) -> Result<Json<PullRequestResponse>, ApiErr> {
    let req = json_body(payload)?;
    let pr = state.engine.merge_pull_request(&req.pull_request_id).await?;
    Ok(Json(PullRequestResponse { pr: pr.into() }))
}

/// POST /pullRequest/reassign: swap one reviewer.
async fn reassign_reviewer(
    State(state): State<AppState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<ReassignResponse>, ApiErr> {
    let req = json_body(payload)?;
    let reassignment = state
        .engine
        .reassign_reviewer(&req.pull_request_id, &req.old_reviewer_id)
        .await?;
    Ok(Json(ReassignResponse {
        pr: reassignment.pull_request.into(),
        replaced_by: reassignment.replaced_by,
    }))
}

/// GET /stats/assignments: reviewer load and per pull request counts.
async fn get_assignment_stats(
    State(state): State<AppState>,
) -> Result<Json<AssignmentStats>, ApiErr> {
    Ok(Json(stats::assignment_stats(&state.db).await?))
}
