//! Application error types.
//!
//! Every error carries a stable machine-readable code (see [`AppError::code`])
//! and a human-readable message. The HTTP layer renders both; nothing else
//! (internal ids, SQL text) leaves the process.

use serde::Serialize;
use thiserror::Error;

/// Application-level errors returned by the engine and the directory services.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Malformed or missing input.
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Referenced team, user or pull request does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// A team with this name already exists.
    #[error("Team already exists: {team_name}")]
    TeamExists { team_name: String },

    /// A pull request with this id already exists.
    #[error("Pull request already exists: {pull_request_id}")]
    PrExists { pull_request_id: String },

    /// Reviewer mutation attempted on a merged pull request.
    #[error("Pull request is merged: {pull_request_id}")]
    PrMerged { pull_request_id: String },

    /// The named user is not a current reviewer of the pull request.
    #[error("Reviewer {user_id} is not assigned to {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// No active teammate is left to take over the review.
    #[error("No eligible reviewer for {pull_request_id}")]
    NoCandidate { pull_request_id: String },

    /// Store operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending field.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    pub fn pr_exists(pull_request_id: impl Into<String>) -> Self {
        Self::PrExists {
            pull_request_id: pull_request_id.into(),
        }
    }

    pub fn pr_merged(pull_request_id: impl Into<String>) -> Self {
        Self::PrMerged {
            pull_request_id: pull_request_id.into(),
        }
    }

    pub fn not_assigned(pull_request_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pull_request_id: pull_request_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn no_candidate(pull_request_id: impl Into<String>) -> Self {
        Self::NoCandidate {
            pull_request_id: pull_request_id.into(),
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::PrExists { .. } => "PR_EXISTS",
            Self::PrMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate { .. } => "NO_CANDIDATE",
            Self::Database { .. } | Self::Internal { .. } => "INTERNAL",
        }
    }

    /// Whether this error hides infrastructure details from callers.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Internal { .. })
    }
}

// Conversions from common error types

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::Database {
            message: err.to_string(),
            operation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AppError::pr_merged("pr-1");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"PrMerged\""));
        assert!(json.contains("pr-1"));
    }

    #[test]
    fn test_not_found_with_id() {
        let err = AppError::not_found_with_id("PullRequest", "pr-9");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"resource\":\"PullRequest\""));
        assert!(json.contains("\"id\":\"pr-9\""));
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let err = AppError::validation("title required");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("field"));
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AppError::validation("x").code(), "VALIDATION_FAILED");
        assert_eq!(AppError::not_found_with_id("Team", "core").code(), "NOT_FOUND");
        assert_eq!(AppError::team_exists("core").code(), "TEAM_EXISTS");
        assert_eq!(AppError::pr_exists("pr-1").code(), "PR_EXISTS");
        assert_eq!(AppError::pr_merged("pr-1").code(), "PR_MERGED");
        assert_eq!(AppError::not_assigned("pr-1", "u1").code(), "NOT_ASSIGNED");
        assert_eq!(AppError::no_candidate("pr-1").code(), "NO_CANDIDATE");
        assert_eq!(AppError::internal("boom").code(), "INTERNAL");
        assert_eq!(AppError::database_with_op("locked", "insert").code(), "INTERNAL");
    }

    #[test]
    fn test_display_impl() {
        let err = AppError::not_assigned("pr-1", "u7");
        assert_eq!(format!("{}", err), "Reviewer u7 is not assigned to pr-1");
    }
}
