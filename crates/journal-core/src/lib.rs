//! Journal Core - Manuscript submission and peer review workflow
//!
//! This crate provides the core of a journal's editorial system:
//!
//! - **Article**: Status machine (draft→submitted→underReview→…→published) with milestone dates
//! - **History**: Append-only status history log and an audit that cross-checks it against articles
//! - **File**: Versioned uploads grouped by (article, category, round), one active manuscript per round
//! - **Review**: Reviewer invitations with their own sub-lifecycle, reminders and expiry
//! - **Issue**: Issue assembly and the publication gate that cascades onto member articles
//! - **Actor**: Roles and per-article relationships resolved into capability flags
//! - **Event**: Append-only change log written alongside every mutation
//! - **Persistence**: Store trait with in-memory and SQLite implementations
//! - **Config**: Keyword limits, default review deadlines, storage and server settings
//!
//! # Architecture
//!
//! Every operation goes through [`Workflow`], which takes the acting user
//! explicitly, validates against freshly loaded records, and writes records
//! and events inside one store transaction. Writes are compare-and-swap on a
//! per-record version, so a request based on a stale read fails with a
//! conflict instead of overwriting.
//!
//! ```text
//! Actor → Workflow → Store (articles, history, files, reviews, issues, events)
//! ```

pub mod actor;
pub mod article;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod issue;
pub mod persistence;
pub mod review;
pub mod workflow;

pub use actor::{access_for, Access, Actor, Role, UserId};
pub use article::{
    Article, ArticleId, ArticleStatus, ArticleUpdate, AuthorRecord, HistoryAudit, NewArticle,
    StatusHistory, StatusHistoryId,
};
pub use config::{ArticleConfig, ConfigError, JournalConfig, ReviewConfig, ServerConfig, StorageConfig};
pub use error::{ErrorKind, JournalError, Result};
pub use event::{EntityType, Event, EventId, EventPayload};
pub use file::{ArticleFile, FileCategory, FileFilter, FileId, FileMetadata, FileUpload};
pub use issue::{
    DoiAssignment, Issue, IssueId, IssueUpdate, NewIssue, PublishRequest, UnreadyArticle,
};
pub use persistence::{InMemoryStore, Store};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteStore;
pub use review::{
    InvitationFailure, InvitationRequest, Recommendation, Review, ReviewId, ReviewStatus,
    ReviewSubmission,
};
pub use workflow::{Command, Outcome, TransitionRequest, Workflow};

/// Returns the version of journal-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
