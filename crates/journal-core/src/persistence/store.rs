//! Storage adapter interface

use crate::actor::UserId;
use crate::article::{Article, ArticleId, StatusHistory, StatusHistoryId};
use crate::error::Result;
use crate::event::{EntityType, Event};
use crate::file::{ArticleFile, FileCategory, FileId};
use crate::issue::{Issue, IssueId};
use crate::review::{Review, ReviewId};

/// Record collections behind the workflow.
///
/// Implementations enforce the uniqueness rules themselves rather than
/// trusting the workflow's pre-checks:
///
/// - one review per (article, reviewer), failing with `DuplicateInvitation`
/// - one article per DOI, failing with `DuplicateDoi`
/// - one issue per (volume, issue), failing with `Conflict`
/// - one file per (article, category, round, version) and at most one
///   active manuscript per (article, round), failing with `Conflict`
///
/// `update_*` methods taking an `expected_version` are compare-and-swap
/// writes: the stored record must still carry `expected_version`, otherwise
/// the write fails with `Conflict` and nothing changes.
pub trait Store: Send {
    /// Start a transaction. Nested transactions are not supported.
    fn begin(&mut self) -> Result<()>;

    /// Make every write since `begin` durable
    fn commit(&mut self) -> Result<()>;

    /// Discard every write since `begin`
    fn rollback(&mut self) -> Result<()>;

    // Articles

    fn insert_article(&mut self, article: &Article) -> Result<()>;

    fn get_article(&self, id: &ArticleId) -> Result<Option<Article>>;

    fn update_article(&mut self, article: &Article, expected_version: u64) -> Result<()>;

    fn find_article_by_doi(&self, doi: &str) -> Result<Option<Article>>;

    // Status history

    fn insert_history(&mut self, record: &StatusHistory) -> Result<()>;

    fn get_history(&self, id: &StatusHistoryId) -> Result<Option<StatusHistory>>;

    // Files

    fn insert_file(&mut self, file: &ArticleFile) -> Result<()>;

    fn get_file(&self, id: &FileId) -> Result<Option<ArticleFile>>;

    fn update_file(&mut self, file: &ArticleFile) -> Result<()>;

    /// Returns whether a record was removed
    fn delete_file(&mut self, id: &FileId) -> Result<bool>;

    /// Every file of an article, in (round, category, version) order
    fn files_for_article(&self, article_id: &ArticleId) -> Result<Vec<ArticleFile>>;

    /// Next version in a group: one past the highest ever assigned
    fn next_file_version(
        &self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<u32>;

    /// Deactivate every file in a group, returning how many changed
    fn deactivate_files(
        &mut self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<usize>;

    /// Whether any round holds an active file of this category
    fn has_active_file(&self, article_id: &ArticleId, category: FileCategory) -> Result<bool>;

    // Reviews

    fn insert_review(&mut self, review: &Review) -> Result<()>;

    fn get_review(&self, id: &ReviewId) -> Result<Option<Review>>;

    fn update_review(&mut self, review: &Review, expected_version: u64) -> Result<()>;

    fn find_review(&self, article_id: &ArticleId, reviewer_id: &UserId) -> Result<Option<Review>>;

    /// Reviews of an article, oldest invitation first
    fn reviews_for_article(&self, article_id: &ArticleId) -> Result<Vec<Review>>;

    /// Reviews assigned to a reviewer, oldest invitation first
    fn reviews_for_reviewer(&self, reviewer_id: &UserId) -> Result<Vec<Review>>;

    // Issues

    fn insert_issue(&mut self, issue: &Issue) -> Result<()>;

    fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>>;

    fn update_issue(&mut self, issue: &Issue, expected_version: u64) -> Result<()>;

    /// Returns whether a record was removed
    fn delete_issue(&mut self, id: &IssueId) -> Result<bool>;

    // Events

    /// Append an event, assigning its sequence number
    fn append_event(&mut self, event: Event) -> Result<Event>;

    fn events_for_entity(&self, entity_id: &str, entity_type: EntityType) -> Result<Vec<Event>>;

    /// At most `limit` events after `sequence`, in order
    fn events_after(&self, sequence: u64, limit: usize) -> Result<Vec<Event>>;

    /// Sequence number of the newest event, 0 when the log is empty
    fn last_sequence(&self) -> Result<u64>;
}
