//! Journal issues and their publication gate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::{ArticleId, ArticleStatus};
use crate::error::{IssueError, JournalError, Result};

/// Unique identifier for an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub Uuid);

impl IssueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid issue id {:?}: {}", s, e)))
    }
}

impl Default for IssueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A numbered issue collecting published articles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub volume_number: u32,
    pub issue_number: u32,
    pub publication_date: Option<DateTime<Utc>>,
    /// Once set, membership is frozen
    pub is_published: bool,
    pub article_ids: Vec<ArticleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Issue {
    pub fn new(new: NewIssue) -> Result<Self> {
        if new.volume_number == 0 || new.issue_number == 0 {
            return Err(JournalError::Validation(
                "volume and issue numbers start at 1".to_string(),
            ));
        }
        let title = match new.title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => generate_title(new.volume_number, new.issue_number),
        };
        let now = Utc::now();
        Ok(Self {
            id: IssueId::new(),
            title,
            volume_number: new.volume_number,
            issue_number: new.issue_number,
            publication_date: new.publication_date,
            is_published: false,
            article_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn contains(&self, article_id: &ArticleId) -> bool {
        self.article_ids.contains(article_id)
    }

    /// Add a member; returns false if it was already present
    pub fn add_article(&mut self, article_id: ArticleId) -> Result<bool> {
        self.ensure_unlocked()?;
        if self.contains(&article_id) {
            return Ok(false);
        }
        self.article_ids.push(article_id);
        self.touch();
        Ok(true)
    }

    /// Remove a member; returns false if it was not present
    pub fn remove_article(&mut self, article_id: &ArticleId) -> Result<bool> {
        self.ensure_unlocked()?;
        let before = self.article_ids.len();
        self.article_ids.retain(|id| id != article_id);
        if self.article_ids.len() == before {
            return Ok(false);
        }
        self.touch();
        Ok(true)
    }

    /// Apply an edit to the issue's details. Membership is untouched.
    pub fn apply_update(&mut self, update: IssueUpdate) -> Result<()> {
        self.ensure_unlocked()?;
        let volume_number = update.volume_number.unwrap_or(self.volume_number);
        let issue_number = update.issue_number.unwrap_or(self.issue_number);
        if volume_number == 0 || issue_number == 0 {
            return Err(JournalError::Validation(
                "volume and issue numbers start at 1".to_string(),
            ));
        }
        let renumbered = (volume_number, issue_number) != (self.volume_number, self.issue_number);

        match update.title {
            Some(title) if !title.trim().is_empty() => self.title = title.trim().to_string(),
            Some(_) => self.title = generate_title(volume_number, issue_number),
            // A generated title follows the new numbers
            None if renumbered
                && self.title == generate_title(self.volume_number, self.issue_number) =>
            {
                self.title = generate_title(volume_number, issue_number)
            }
            None => {}
        }
        self.volume_number = volume_number;
        self.issue_number = issue_number;
        if let Some(date) = update.publication_date {
            self.publication_date = Some(date);
        }
        self.touch();
        Ok(())
    }

    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_published {
            Err(IssueError::Locked(self.id).into())
        } else {
            Ok(())
        }
    }

    /// Mark published; the publication date defaults to now
    pub fn mark_published(&mut self, at: DateTime<Utc>) {
        self.is_published = true;
        self.publication_date.get_or_insert(at);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

/// Default issue title
pub fn generate_title(volume_number: u32, issue_number: u32) -> String {
    format!("Vol.{} No.{}", volume_number, issue_number)
}

/// Input for creating an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewIssue {
    /// Generated from the numbers when blank
    pub title: Option<String>,
    pub volume_number: u32,
    pub issue_number: u32,
    pub publication_date: Option<DateTime<Utc>>,
}

/// Edit to an unpublished issue's details; absent fields are kept
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueUpdate {
    /// A blank title is regenerated from the numbers
    pub title: Option<String>,
    pub volume_number: Option<u32>,
    pub issue_number: Option<u32>,
    pub publication_date: Option<DateTime<Utc>>,
}

/// A member article blocking publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadyArticle {
    pub id: ArticleId,
    pub title: String,
    pub status: ArticleStatus,
}

/// DOI to set on a member article during publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoiAssignment {
    pub article_id: ArticleId,
    pub doi: String,
}

/// Publish request for [`crate::Workflow::publish_issue`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub issue_id: IssueId,
    #[serde(default)]
    pub dois: Vec<DoiAssignment>,
}

impl PublishRequest {
    pub fn new(issue_id: IssueId) -> Self {
        Self {
            issue_id,
            dois: Vec::new(),
        }
    }
}
