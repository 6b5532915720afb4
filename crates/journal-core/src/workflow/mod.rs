//! Workflow operations over a [`Store`]
//!
//! [`Workflow`] is the entry point for every core operation. Each operation
//! takes the acting user explicitly, checks authorization and business rules
//! against freshly loaded records, then performs all of its writes (records
//! plus events) inside one store transaction.

mod articles;
mod command;
mod files;
mod issues;
mod reviews;

pub use articles::TransitionRequest;
pub use command::{Command, Outcome};

use crate::actor::Actor;
use crate::article::{Article, ArticleId};
use crate::config::JournalConfig;
use crate::error::{JournalError, Result};
use crate::event::{EntityType, Event};
use crate::file::{ArticleFile, FileId};
use crate::issue::{Issue, IssueId};
use crate::persistence::Store;
use crate::review::{Review, ReviewId};

/// The journal workflow engine
pub struct Workflow<S: Store> {
    store: S,
    config: JournalConfig,
}

impl<S: Store> Workflow<S> {
    pub fn new(store: S, config: JournalConfig) -> Self {
        Self { store, config }
    }

    /// Workflow with default configuration
    pub fn with_store(store: S) -> Self {
        Self::new(store, JournalConfig::default())
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Events recorded for one entity, in order
    pub fn events_for(&self, entity_id: &str, entity_type: EntityType) -> Result<Vec<Event>> {
        self.store.events_for_entity(entity_id, entity_type)
    }

    /// Events recorded after `sequence`, in order
    pub fn events_after(&self, sequence: u64) -> Result<Vec<Event>> {
        self.store.events_after(sequence, usize::MAX)
    }

    /// One page of the change log after `sequence`
    pub fn event_page(&self, sequence: u64, limit: usize) -> Result<Vec<Event>> {
        self.store.events_after(sequence, limit)
    }

    /// Sequence number of the newest event
    pub fn last_sequence(&self) -> Result<u64> {
        self.store.last_sequence()
    }

    /// Run `f` inside a store transaction: commit on success, roll back on
    /// any error.
    pub(crate) fn in_transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.store.begin()?;
        let result = f(self).and_then(|value| self.store.commit().map(|_| value));
        if let Err(err) = &result {
            tracing::debug!(error = %err, "rolling back transaction");
            if let Err(rollback_err) = self.store.rollback() {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
        }
        result
    }

    pub(crate) fn record(&mut self, event: Event) -> Result<Event> {
        self.store.append_event(event)
    }

    pub(crate) fn load_article(&self, id: &ArticleId) -> Result<Article> {
        self.store
            .get_article(id)?
            .ok_or_else(|| JournalError::NotFound(format!("article {}", id)))
    }

    pub(crate) fn load_file(&self, id: &FileId) -> Result<ArticleFile> {
        self.store
            .get_file(id)?
            .ok_or_else(|| JournalError::NotFound(format!("file {}", id)))
    }

    pub(crate) fn load_review(&self, id: &ReviewId) -> Result<Review> {
        self.store
            .get_review(id)?
            .ok_or_else(|| JournalError::NotFound(format!("review {}", id)))
    }

    pub(crate) fn load_issue(&self, id: &IssueId) -> Result<Issue> {
        self.store
            .get_issue(id)?
            .ok_or_else(|| JournalError::NotFound(format!("issue {}", id)))
    }

    /// Whether `actor` may read the article and its files: anyone with
    /// view access, plus reviewers who accepted or completed a review.
    pub(crate) fn can_read(&self, actor: &Actor, article: &Article) -> Result<bool> {
        if crate::actor::access_for(actor, article).can_view() {
            return Ok(true);
        }
        Ok(self
            .store
            .find_review(&article.id, &actor.id)?
            .map_or(false, |r| r.status.grants_file_access()))
    }
}

/// Reject a request made against a stale read
pub(crate) fn check_expected_version(
    entity: impl std::fmt::Display,
    expected: Option<u64>,
    actual: u64,
) -> Result<()> {
    match expected {
        Some(expected) if expected != actual => {
            tracing::warn!(%entity, expected, actual, "rejected stale request");
            Err(JournalError::stale(entity, expected, actual))
        }
        _ => Ok(()),
    }
}
