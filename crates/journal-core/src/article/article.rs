//! Article aggregate and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ArticleStatus, StatusHistoryId};
use crate::actor::UserId;
use crate::config::ArticleConfig;
use crate::error::{JournalError, Result};
use crate::issue::IssueId;

/// Unique identifier for an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Create a new random article ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an article ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid article id {:?}: {}", s, e)))
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a node in the field taxonomy (managed elsewhere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldId(pub Uuid);

impl FieldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FieldId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A co-author entry. Authors may or may not hold an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// Account of this author, if any
    pub user_id: Option<UserId>,
    pub full_name: String,
    pub email: String,
    pub institution: Option<String>,
    pub country: Option<String>,
    pub is_corresponding: bool,
    /// Position in the byline (1-based)
    pub order: u32,
    pub orcid: Option<String>,
}

impl AuthorRecord {
    /// Author who holds an account
    pub fn with_account(
        user_id: UserId,
        full_name: impl Into<String>,
        email: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::without_account(full_name, email, order)
        }
    }

    /// Author known only by name and email
    pub fn without_account(full_name: impl Into<String>, email: impl Into<String>, order: u32) -> Self {
        Self {
            user_id: None,
            full_name: full_name.into(),
            email: email.into(),
            institution: None,
            country: None,
            is_corresponding: false,
            order,
            orcid: None,
        }
    }

    pub fn has_account(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Dates of first entry into the milestone statuses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    pub submitted_date: Option<DateTime<Utc>>,
    pub accepted_date: Option<DateTime<Utc>>,
    pub rejected_date: Option<DateTime<Utc>>,
    pub published_date: Option<DateTime<Utc>>,
}

impl Milestones {
    fn slot(&mut self, status: ArticleStatus) -> Option<&mut Option<DateTime<Utc>>> {
        match status {
            ArticleStatus::Submitted => Some(&mut self.submitted_date),
            ArticleStatus::Accepted => Some(&mut self.accepted_date),
            ArticleStatus::Rejected => Some(&mut self.rejected_date),
            ArticleStatus::Published => Some(&mut self.published_date),
            _ => None,
        }
    }

    /// Record entry into `status` at `at`. Only the first entry is kept;
    /// returns whether a date was written.
    pub fn record(&mut self, status: ArticleStatus, at: DateTime<Utc>) -> bool {
        match self.slot(status) {
            Some(slot) if slot.is_none() => {
                *slot = Some(at);
                true
            }
            _ => false,
        }
    }

    /// The milestone date for `status`, if it has one and it was reached
    pub fn get(&self, status: ArticleStatus) -> Option<DateTime<Utc>> {
        match status {
            ArticleStatus::Submitted => self.submitted_date,
            ArticleStatus::Accepted => self.accepted_date,
            ArticleStatus::Rejected => self.rejected_date,
            ArticleStatus::Published => self.published_date,
            _ => None,
        }
    }
}

/// Input for creating a draft article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewArticle {
    pub title_prefix: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub language: String,
    pub field_id: FieldId,
    pub secondary_field_ids: Vec<FieldId>,
    pub authors: Vec<AuthorRecord>,
    pub submitter_note: Option<String>,
}

/// Partial content update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleUpdate {
    pub title_prefix: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub language: Option<String>,
    pub field_id: Option<FieldId>,
    pub secondary_field_ids: Option<Vec<FieldId>>,
    pub authors: Option<Vec<AuthorRecord>>,
    pub submitter_note: Option<String>,
    pub editor_note: Option<String>,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
}

/// A manuscript moving through submission, review and publication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,

    // Content
    pub title_prefix: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub language: String,
    pub field_id: FieldId,
    pub secondary_field_ids: Vec<FieldId>,

    // Participants
    /// Owner of the submission; never changes
    pub submitter_id: UserId,
    /// Co-authors in byline order
    pub authors: Vec<AuthorRecord>,
    pub editor_id: Option<UserId>,

    // Lifecycle
    pub status: ArticleStatus,
    /// Ordered, append-only references into the status history log
    pub status_history: Vec<StatusHistoryId>,
    pub current_round: u32,
    pub milestones: Milestones,

    // Publication
    pub doi: Option<String>,
    pub issue_id: Option<IssueId>,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,

    // Notes
    pub submitter_note: Option<String>,
    pub editor_note: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every write; used for optimistic concurrency
    pub version: u64,
}

impl Article {
    /// Create a draft article owned by `submitter_id`
    pub fn new(submitter_id: UserId, new: NewArticle) -> Self {
        let now = Utc::now();
        let mut authors = new.authors;
        authors.sort_by_key(|a| a.order);
        Self {
            id: ArticleId::new(),
            title_prefix: new.title_prefix,
            title: new.title.trim().to_string(),
            subtitle: new.subtitle,
            abstract_text: new.abstract_text,
            keywords: new.keywords,
            language: new.language,
            field_id: new.field_id,
            secondary_field_ids: new.secondary_field_ids,
            submitter_id,
            authors,
            editor_id: None,
            status: ArticleStatus::Draft,
            status_history: Vec::new(),
            current_round: 1,
            milestones: Milestones::default(),
            doi: None,
            issue_id: None,
            page_start: None,
            page_end: None,
            submitter_note: new.submitter_note,
            editor_note: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// The submitter and every co-author holding an account count as authors
    pub fn is_author(&self, user_id: &UserId) -> bool {
        self.submitter_id == *user_id || self.authors.iter().any(|a| a.user_id.as_ref() == Some(user_id))
    }

    /// Check content invariants
    pub fn validate(&self, config: &ArticleConfig) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(JournalError::Validation("title is required".to_string()));
        }
        if self.abstract_text.trim().is_empty() {
            return Err(JournalError::Validation("abstract is required".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(JournalError::Validation("language is required".to_string()));
        }
        let keywords = self.keywords.iter().filter(|k| !k.trim().is_empty()).count();
        if keywords < config.min_keywords || keywords > config.max_keywords {
            return Err(JournalError::Validation(format!(
                "between {} and {} keywords are required, got {}",
                config.min_keywords, config.max_keywords, keywords
            )));
        }
        for author in &self.authors {
            if author.full_name.trim().is_empty() || !author.email.contains('@') {
                return Err(JournalError::Validation(format!(
                    "author #{} needs a name and a valid email",
                    author.order
                )));
            }
        }
        match (self.page_start, self.page_end) {
            (Some(0), _) | (_, Some(0)) => Err(JournalError::Validation(
                "page numbers start at 1".to_string(),
            )),
            (Some(start), Some(end)) if end < start => Err(JournalError::Validation(format!(
                "page end {} is before page start {}",
                end, start
            ))),
            _ => Ok(()),
        }
    }

    /// Apply a content patch, returning the names of the fields it touched
    pub fn apply_update(&mut self, update: ArticleUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(v) = update.title_prefix {
            self.title_prefix = Some(v);
            changed.push("title_prefix");
        }
        if let Some(v) = update.title {
            self.title = v.trim().to_string();
            changed.push("title");
        }
        if let Some(v) = update.subtitle {
            self.subtitle = Some(v);
            changed.push("subtitle");
        }
        if let Some(v) = update.abstract_text {
            self.abstract_text = v;
            changed.push("abstract");
        }
        if let Some(v) = update.keywords {
            self.keywords = v;
            changed.push("keywords");
        }
        if let Some(v) = update.language {
            self.language = v;
            changed.push("language");
        }
        if let Some(v) = update.field_id {
            self.field_id = v;
            changed.push("field_id");
        }
        if let Some(v) = update.secondary_field_ids {
            self.secondary_field_ids = v;
            changed.push("secondary_field_ids");
        }
        if let Some(mut v) = update.authors {
            v.sort_by_key(|a| a.order);
            self.authors = v;
            changed.push("authors");
        }
        if let Some(v) = update.submitter_note {
            self.submitter_note = Some(v);
            changed.push("submitter_note");
        }
        if let Some(v) = update.editor_note {
            self.editor_note = Some(v);
            changed.push("editor_note");
        }
        if let Some(v) = update.page_start {
            self.page_start = Some(v);
            changed.push("page_start");
        }
        if let Some(v) = update.page_end {
            self.page_end = Some(v);
            changed.push("page_end");
        }
        changed
    }

    /// Move to `status`, appending the history reference and recording the
    /// milestone on first entry. Legality is checked by the caller.
    pub fn enter_status(&mut self, status: ArticleStatus, history_id: StatusHistoryId, at: DateTime<Utc>) {
        self.status = status;
        self.status_history.push(history_id);
        self.milestones.record(status, at);
        self.touch(at);
    }

    /// Bump the version after a change
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}
