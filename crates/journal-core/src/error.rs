//! Error types for journal-core

use serde::Serialize;
use thiserror::Error;

use crate::actor::UserId;
use crate::article::{ArticleId, ArticleStatus};
use crate::issue::{IssueId, UnreadyArticle};
use crate::review::{InvitationFailure, ReviewId, ReviewStatus};

/// Result type alias for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

/// Main error type for journal operations
#[derive(Error, Debug)]
pub enum JournalError {
    /// Article lifecycle errors
    #[error("Article error: {0}")]
    Article(#[from] ArticleError),

    /// Review invitation errors
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Issue publication errors
    #[error("Issue error: {0}")]
    Issue(#[from] IssueError),

    /// Storage failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor lacks the required relationship or role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Write rejected because it was based on a stale read, or clashes with
    /// an existing record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl JournalError {
    /// Build a stale-version conflict
    pub fn stale(entity: impl std::fmt::Display, expected: u64, actual: u64) -> Self {
        JournalError::Conflict(format!(
            "{} was modified concurrently (expected version {}, found {})",
            entity, expected, actual
        ))
    }

    /// The stable error kind for this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            JournalError::Article(e) => match e {
                ArticleError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                ArticleError::MissingManuscript(_) => ErrorKind::MissingManuscript,
                ArticleError::Locked { .. } => ErrorKind::ArticleLocked,
                ArticleError::DuplicateDoi(_) => ErrorKind::DuplicateDoi,
            },
            JournalError::Review(e) => match e {
                ReviewError::AlreadyResponded { .. } => ErrorKind::AlreadyResponded,
                ReviewError::NotAccepted { .. } => ErrorKind::NotAccepted,
                ReviewError::MissingReason => ErrorKind::MissingReason,
                ReviewError::MissingRecommendation => ErrorKind::MissingRecommendation,
                ReviewError::InvalidReminderState { .. } => ErrorKind::InvalidReminderState,
                ReviewError::DuplicateInvitation { .. } => ErrorKind::DuplicateInvitation,
                ReviewError::InvitationsRejected { failures, .. } => {
                    if failures.iter().any(InvitationFailure::is_duplicate) {
                        ErrorKind::DuplicateInvitation
                    } else {
                        ErrorKind::Validation
                    }
                }
            },
            JournalError::Issue(e) => match e {
                IssueError::AlreadyPublished(_) => ErrorKind::AlreadyPublished,
                IssueError::EmptyIssue(_) => ErrorKind::EmptyIssue,
                IssueError::ArticlesNotReady { .. } => ErrorKind::ArticlesNotReady,
                IssueError::Locked(_) => ErrorKind::IssueLocked,
                IssueError::DuplicateDois(_) => ErrorKind::DuplicateDoi,
            },
            JournalError::Persistence(_) => ErrorKind::Internal,
            JournalError::NotFound(_) => ErrorKind::NotFound,
            JournalError::Forbidden(_) => ErrorKind::Forbidden,
            JournalError::Conflict(_) => ErrorKind::Conflict,
            JournalError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Per-item details for batch failures
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            JournalError::Review(ReviewError::InvitationsRejected { failures, .. }) => {
                serde_json::to_value(failures).ok()
            }
            JournalError::Issue(IssueError::ArticlesNotReady { articles, .. }) => {
                serde_json::to_value(articles).ok()
            }
            JournalError::Issue(IssueError::DuplicateDois(dois)) => serde_json::to_value(dois).ok(),
            _ => None,
        }
    }
}

/// Closed set of failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidTransition,
    MissingManuscript,
    ArticleLocked,
    AlreadyResponded,
    NotAccepted,
    MissingReason,
    MissingRecommendation,
    InvalidReminderState,
    DuplicateInvitation,
    AlreadyPublished,
    EmptyIssue,
    ArticlesNotReady,
    IssueLocked,
    DuplicateDoi,
    Conflict,
    Validation,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorKind {
    /// Machine-checkable error code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::MissingManuscript => "MISSING_MANUSCRIPT",
            ErrorKind::ArticleLocked => "ARTICLE_LOCKED",
            ErrorKind::AlreadyResponded => "ALREADY_RESPONDED",
            ErrorKind::NotAccepted => "NOT_ACCEPTED",
            ErrorKind::MissingReason => "MISSING_REASON",
            ErrorKind::MissingRecommendation => "MISSING_RECOMMENDATION",
            ErrorKind::InvalidReminderState => "INVALID_REMINDER_STATE",
            ErrorKind::DuplicateInvitation => "DUPLICATE_INVITATION",
            ErrorKind::AlreadyPublished => "ALREADY_PUBLISHED",
            ErrorKind::EmptyIssue => "EMPTY_ISSUE",
            ErrorKind::ArticlesNotReady => "ARTICLES_NOT_READY",
            ErrorKind::IssueLocked => "ISSUE_LOCKED",
            ErrorKind::DuplicateDoi => "DUPLICATE_DOI",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Article-specific errors
#[derive(Error, Debug)]
pub enum ArticleError {
    /// Status graph violation
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ArticleStatus,
        to: ArticleStatus,
    },

    /// Submission attempted without an active manuscript file
    #[error("Article {0} has no active manuscript file")]
    MissingManuscript(ArticleId),

    /// Mutation attempted outside the editable states
    #[error("Article {id} cannot be modified in status {status}")]
    Locked { id: ArticleId, status: ArticleStatus },

    /// DOI already assigned to another article
    #[error("DOI already in use: {0}")]
    DuplicateDoi(String),
}

/// Review invitation errors
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Accept/decline on an invitation that was already answered
    #[error("Review {id} has already been responded to (status {status})")]
    AlreadyResponded { id: ReviewId, status: ReviewStatus },

    /// Completion attempted before acceptance
    #[error("Review {id} must be accepted before it can be completed (status {status})")]
    NotAccepted { id: ReviewId, status: ReviewStatus },

    /// Decline without a reason
    #[error("A reason is required to decline a review invitation")]
    MissingReason,

    /// Completion without a recommendation
    #[error("A recommendation is required to complete a review")]
    MissingRecommendation,

    /// Reminder for an invitation that is no longer open
    #[error("Reminders can only be sent for invited or accepted reviews (review {id} is {status})")]
    InvalidReminderState { id: ReviewId, status: ReviewStatus },

    /// Reviewer already invited for this article
    #[error("Reviewer {reviewer_id} is already invited for article {article_id}")]
    DuplicateInvitation {
        article_id: ArticleId,
        reviewer_id: UserId,
    },

    /// One or more reviewers in a batch could not be invited
    #[error("{} invitation(s) rejected for article {article_id}", failures.len())]
    InvitationsRejected {
        article_id: ArticleId,
        failures: Vec<InvitationFailure>,
    },
}

/// Issue publication errors
#[derive(Error, Debug)]
pub enum IssueError {
    /// Issue was already published
    #[error("Issue {0} is already published")]
    AlreadyPublished(IssueId),

    /// Issue has no member articles
    #[error("Issue {0} has no articles")]
    EmptyIssue(IssueId),

    /// Member articles are not accepted or published
    #[error("Issue {issue_id} has {} article(s) that are not accepted or published", articles.len())]
    ArticlesNotReady {
        issue_id: IssueId,
        articles: Vec<UnreadyArticle>,
    },

    /// Membership change on a published issue
    #[error("Issue {0} is published and its articles can no longer change")]
    Locked(IssueId),

    /// DOIs in a publish request clash with each other or with existing articles
    #[error("DOI(s) already in use: {}", .0.join(", "))]
    DuplicateDois(Vec<String>),
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Transaction misuse (nested begin, commit without begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
}

/// Failure to parse one of the closed string enums
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        JournalError::Persistence(PersistenceError::Database(err.to_string()))
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Persistence(PersistenceError::Serialization(err.to_string()))
    }
}
