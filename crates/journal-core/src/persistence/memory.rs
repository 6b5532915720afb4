//! In-memory store
//!
//! `begin` snapshots every collection and `rollback` restores the snapshot,
//! which gives the same all-or-nothing behavior as the SQLite store.

use std::collections::HashMap;

use super::Store;
use crate::actor::UserId;
use crate::article::{Article, ArticleId, StatusHistory, StatusHistoryId};
use crate::error::{ArticleError, JournalError, PersistenceError, Result, ReviewError};
use crate::event::{EntityType, Event};
use crate::file::{ArticleFile, FileCategory, FileId};
use crate::issue::{Issue, IssueId};
use crate::review::{Review, ReviewId};

#[derive(Debug, Clone, Default)]
struct Tables {
    articles: HashMap<ArticleId, Article>,
    history: HashMap<StatusHistoryId, StatusHistory>,
    files: HashMap<FileId, ArticleFile>,
    /// Highest version ever assigned per file group, kept across deletions
    file_versions: HashMap<(ArticleId, FileCategory, u32), u32>,
    reviews: HashMap<ReviewId, Review>,
    issues: HashMap<IssueId, Issue>,
    events: Vec<Event>,
    sequence: u64,
}

/// Hash-map backed [`Store`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Tables,
    snapshot: Option<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn check_doi(&self, article: &Article) -> Result<()> {
        if let Some(doi) = &article.doi {
            let taken = self
                .tables
                .articles
                .values()
                .any(|a| a.id != article.id && a.doi.as_deref() == Some(doi.as_str()));
            if taken {
                return Err(ArticleError::DuplicateDoi(doi.clone()).into());
            }
        }
        Ok(())
    }

    fn check_active_manuscript(&self, file: &ArticleFile) -> Result<()> {
        if file.category != FileCategory::Manuscript || !file.is_active {
            return Ok(());
        }
        let clash = self.tables.files.values().any(|f| {
            f.id != file.id
                && f.is_active
                && f.same_group(&file.article_id, FileCategory::Manuscript, file.round)
        });
        if clash {
            return Err(JournalError::Conflict(format!(
                "article {} already has an active manuscript for round {}",
                file.article_id, file.round
            )));
        }
        Ok(())
    }

    fn check_issue_numbers(&self, issue: &Issue) -> Result<()> {
        let clash = self.tables.issues.values().any(|i| {
            i.id != issue.id
                && i.volume_number == issue.volume_number
                && i.issue_number == issue.issue_number
        });
        if clash {
            return Err(JournalError::Conflict(format!(
                "volume {} issue {} already exists",
                issue.volume_number, issue.issue_number
            )));
        }
        Ok(())
    }
}

fn check_version(entity: impl std::fmt::Display, expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(JournalError::stale(entity, expected, actual))
    }
}

impl Store for InMemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(PersistenceError::Transaction("transaction already open".to_string()).into());
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| PersistenceError::Transaction("no open transaction".to_string()).into())
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| PersistenceError::Transaction("no open transaction".to_string()))?;
        self.tables = snapshot;
        Ok(())
    }

    // ==================== Articles ====================

    fn insert_article(&mut self, article: &Article) -> Result<()> {
        if self.tables.articles.contains_key(&article.id) {
            return Err(JournalError::Conflict(format!("article {} already exists", article.id)));
        }
        self.check_doi(article)?;
        self.tables.articles.insert(article.id, article.clone());
        Ok(())
    }

    fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        Ok(self.tables.articles.get(id).cloned())
    }

    fn update_article(&mut self, article: &Article, expected_version: u64) -> Result<()> {
        let stored = self
            .tables
            .articles
            .get(&article.id)
            .ok_or_else(|| JournalError::NotFound(format!("article {}", article.id)))?;
        check_version(format!("article {}", article.id), expected_version, stored.version)?;
        self.check_doi(article)?;
        self.tables.articles.insert(article.id, article.clone());
        Ok(())
    }

    fn find_article_by_doi(&self, doi: &str) -> Result<Option<Article>> {
        Ok(self
            .tables
            .articles
            .values()
            .find(|a| a.doi.as_deref() == Some(doi))
            .cloned())
    }

    // ==================== Status history ====================

    fn insert_history(&mut self, record: &StatusHistory) -> Result<()> {
        if self.tables.history.contains_key(&record.id) {
            return Err(JournalError::Conflict(format!(
                "history record {} already exists",
                record.id
            )));
        }
        self.tables.history.insert(record.id, record.clone());
        Ok(())
    }

    fn get_history(&self, id: &StatusHistoryId) -> Result<Option<StatusHistory>> {
        Ok(self.tables.history.get(id).cloned())
    }

    // ==================== Files ====================

    fn insert_file(&mut self, file: &ArticleFile) -> Result<()> {
        let version_taken = self.tables.files.values().any(|f| {
            f.same_group(&file.article_id, file.category, file.round)
                && f.file_version == file.file_version
        });
        if version_taken || self.tables.files.contains_key(&file.id) {
            return Err(JournalError::Conflict(format!(
                "{} version {} already exists for round {}",
                file.category, file.file_version, file.round
            )));
        }
        self.check_active_manuscript(file)?;
        let last = self
            .tables
            .file_versions
            .entry((file.article_id, file.category, file.round))
            .or_insert(0);
        *last = (*last).max(file.file_version);
        self.tables.files.insert(file.id, file.clone());
        Ok(())
    }

    fn get_file(&self, id: &FileId) -> Result<Option<ArticleFile>> {
        Ok(self.tables.files.get(id).cloned())
    }

    fn update_file(&mut self, file: &ArticleFile) -> Result<()> {
        if !self.tables.files.contains_key(&file.id) {
            return Err(JournalError::NotFound(format!("file {}", file.id)));
        }
        self.check_active_manuscript(file)?;
        self.tables.files.insert(file.id, file.clone());
        Ok(())
    }

    fn delete_file(&mut self, id: &FileId) -> Result<bool> {
        Ok(self.tables.files.remove(id).is_some())
    }

    fn files_for_article(&self, article_id: &ArticleId) -> Result<Vec<ArticleFile>> {
        let mut files: Vec<ArticleFile> = self
            .tables
            .files
            .values()
            .filter(|f| f.article_id == *article_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| (f.round, f.category, f.file_version));
        Ok(files)
    }

    fn next_file_version(
        &self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<u32> {
        let last = self
            .tables
            .file_versions
            .get(&(*article_id, category, round))
            .copied()
            .unwrap_or(0);
        Ok(last + 1)
    }

    fn deactivate_files(
        &mut self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<usize> {
        let mut changed = 0;
        for file in self.tables.files.values_mut() {
            if file.is_active && file.same_group(article_id, category, round) {
                file.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn has_active_file(&self, article_id: &ArticleId, category: FileCategory) -> Result<bool> {
        Ok(self
            .tables
            .files
            .values()
            .any(|f| f.article_id == *article_id && f.category == category && f.is_active))
    }

    // ==================== Reviews ====================

    fn insert_review(&mut self, review: &Review) -> Result<()> {
        let duplicate = self.tables.reviews.contains_key(&review.id)
            || self
                .tables
                .reviews
                .values()
                .any(|r| r.article_id == review.article_id && r.reviewer_id == review.reviewer_id);
        if duplicate {
            return Err(ReviewError::DuplicateInvitation {
                article_id: review.article_id,
                reviewer_id: review.reviewer_id,
            }
            .into());
        }
        self.tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    fn get_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        Ok(self.tables.reviews.get(id).cloned())
    }

    fn update_review(&mut self, review: &Review, expected_version: u64) -> Result<()> {
        let stored = self
            .tables
            .reviews
            .get(&review.id)
            .ok_or_else(|| JournalError::NotFound(format!("review {}", review.id)))?;
        check_version(format!("review {}", review.id), expected_version, stored.version)?;
        self.tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    fn find_review(&self, article_id: &ArticleId, reviewer_id: &UserId) -> Result<Option<Review>> {
        Ok(self
            .tables
            .reviews
            .values()
            .find(|r| r.article_id == *article_id && r.reviewer_id == *reviewer_id)
            .cloned())
    }

    fn reviews_for_article(&self, article_id: &ArticleId) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .tables
            .reviews
            .values()
            .filter(|r| r.article_id == *article_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.invited_at);
        Ok(reviews)
    }

    fn reviews_for_reviewer(&self, reviewer_id: &UserId) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .tables
            .reviews
            .values()
            .filter(|r| r.reviewer_id == *reviewer_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.invited_at);
        Ok(reviews)
    }

    // ==================== Issues ====================

    fn insert_issue(&mut self, issue: &Issue) -> Result<()> {
        if self.tables.issues.contains_key(&issue.id) {
            return Err(JournalError::Conflict(format!("issue {} already exists", issue.id)));
        }
        self.check_issue_numbers(issue)?;
        self.tables.issues.insert(issue.id, issue.clone());
        Ok(())
    }

    fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        Ok(self.tables.issues.get(id).cloned())
    }

    fn update_issue(&mut self, issue: &Issue, expected_version: u64) -> Result<()> {
        let stored = self
            .tables
            .issues
            .get(&issue.id)
            .ok_or_else(|| JournalError::NotFound(format!("issue {}", issue.id)))?;
        check_version(format!("issue {}", issue.id), expected_version, stored.version)?;
        self.check_issue_numbers(issue)?;
        self.tables.issues.insert(issue.id, issue.clone());
        Ok(())
    }

    fn delete_issue(&mut self, id: &IssueId) -> Result<bool> {
        Ok(self.tables.issues.remove(id).is_some())
    }

    // ==================== Events ====================

    fn append_event(&mut self, mut event: Event) -> Result<Event> {
        self.tables.sequence += 1;
        event.sequence = self.tables.sequence;
        self.tables.events.push(event.clone());
        Ok(event)
    }

    fn events_for_entity(&self, entity_id: &str, entity_type: EntityType) -> Result<Vec<Event>> {
        Ok(self
            .tables
            .events
            .iter()
            .filter(|e| e.entity_id == entity_id && e.entity_type == entity_type)
            .cloned()
            .collect())
    }

    fn events_after(&self, sequence: u64, limit: usize) -> Result<Vec<Event>> {
        Ok(self
            .tables
            .events
            .iter()
            .filter(|e| e.sequence > sequence)
            .take(limit)
            .cloned()
            .collect())
    }

    fn last_sequence(&self) -> Result<u64> {
        Ok(self.tables.sequence)
    }
}
