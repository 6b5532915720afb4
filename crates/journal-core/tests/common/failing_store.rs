//! A store wrapper that simulates a crash partway through a write sequence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use journal_core::article::{StatusHistory, StatusHistoryId};
use journal_core::error::PersistenceError;
use journal_core::{
    Article, ArticleFile, ArticleId, EntityType, Event, FileCategory, FileId, Issue, IssueId,
    Result, Review, ReviewId, Store, UserId,
};

/// Delegates to `inner`, but fails `update_article` while armed.
///
/// Workflow transitions insert the history record before updating the
/// article, so arming the switch leaves a history record written and the
/// article update refused, which is exactly a crash between the two steps.
pub struct FailingStore<S> {
    pub inner: S,
    armed: Arc<AtomicBool>,
}

impl<S: Store> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle to arm or disarm the failure after the store moved into a workflow
    pub fn switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.armed)
    }

    fn check(&self) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) {
            Err(PersistenceError::Io("simulated crash".to_string()).into())
        } else {
            Ok(())
        }
    }
}

impl<S: Store> Store for FailingStore<S> {
    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    fn insert_article(&mut self, article: &Article) -> Result<()> {
        self.inner.insert_article(article)
    }

    fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        self.inner.get_article(id)
    }

    fn update_article(&mut self, article: &Article, expected_version: u64) -> Result<()> {
        self.check()?;
        self.inner.update_article(article, expected_version)
    }

    fn find_article_by_doi(&self, doi: &str) -> Result<Option<Article>> {
        self.inner.find_article_by_doi(doi)
    }

    fn insert_history(&mut self, record: &StatusHistory) -> Result<()> {
        self.inner.insert_history(record)
    }

    fn get_history(&self, id: &StatusHistoryId) -> Result<Option<StatusHistory>> {
        self.inner.get_history(id)
    }

    fn insert_file(&mut self, file: &ArticleFile) -> Result<()> {
        self.inner.insert_file(file)
    }

    fn get_file(&self, id: &FileId) -> Result<Option<ArticleFile>> {
        self.inner.get_file(id)
    }

    fn update_file(&mut self, file: &ArticleFile) -> Result<()> {
        self.inner.update_file(file)
    }

    fn delete_file(&mut self, id: &FileId) -> Result<bool> {
        self.inner.delete_file(id)
    }

    fn files_for_article(&self, article_id: &ArticleId) -> Result<Vec<ArticleFile>> {
        self.inner.files_for_article(article_id)
    }

    fn next_file_version(
        &self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<u32> {
        self.inner.next_file_version(article_id, category, round)
    }

    fn deactivate_files(
        &mut self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<usize> {
        self.inner.deactivate_files(article_id, category, round)
    }

    fn has_active_file(&self, article_id: &ArticleId, category: FileCategory) -> Result<bool> {
        self.inner.has_active_file(article_id, category)
    }

    fn insert_review(&mut self, review: &Review) -> Result<()> {
        self.inner.insert_review(review)
    }

    fn get_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        self.inner.get_review(id)
    }

    fn update_review(&mut self, review: &Review, expected_version: u64) -> Result<()> {
        self.inner.update_review(review, expected_version)
    }

    fn find_review(&self, article_id: &ArticleId, reviewer_id: &UserId) -> Result<Option<Review>> {
        self.inner.find_review(article_id, reviewer_id)
    }

    fn reviews_for_article(&self, article_id: &ArticleId) -> Result<Vec<Review>> {
        self.inner.reviews_for_article(article_id)
    }

    fn reviews_for_reviewer(&self, reviewer_id: &UserId) -> Result<Vec<Review>> {
        self.inner.reviews_for_reviewer(reviewer_id)
    }

    fn insert_issue(&mut self, issue: &Issue) -> Result<()> {
        self.inner.insert_issue(issue)
    }

    fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        self.inner.get_issue(id)
    }

    fn update_issue(&mut self, issue: &Issue, expected_version: u64) -> Result<()> {
        self.inner.update_issue(issue, expected_version)
    }

    fn delete_issue(&mut self, id: &IssueId) -> Result<bool> {
        self.inner.delete_issue(id)
    }

    fn append_event(&mut self, event: Event) -> Result<Event> {
        self.inner.append_event(event)
    }

    fn events_for_entity(&self, entity_id: &str, entity_type: EntityType) -> Result<Vec<Event>> {
        self.inner.events_for_entity(entity_id, entity_type)
    }

    fn events_after(&self, sequence: u64, limit: usize) -> Result<Vec<Event>> {
        self.inner.events_after(sequence, limit)
    }

    fn last_sequence(&self) -> Result<u64> {
        self.inner.last_sequence()
    }
}
