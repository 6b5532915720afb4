//! Article status machine
//!
//! State transitions:
//! ```text
//! Draft → Submitted → UnderReview → Accepted → Published
//!             ↓           ↓    ↑
//!          Rejected   Rejected  Resubmitted
//!                         ↓         ↑
//!                   RevisionRequired
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// The lifecycle status of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArticleStatus {
    /// Being prepared by its authors
    #[default]
    Draft,
    /// Handed to the journal, awaiting editorial triage
    Submitted,
    /// Out with reviewers
    UnderReview,
    /// Reviewers asked for changes
    RevisionRequired,
    /// Authors sent a revised version
    Resubmitted,
    /// Accepted for publication
    Accepted,
    /// Rejected (terminal)
    Rejected,
    /// Published (terminal)
    Published,
}

impl ArticleStatus {
    /// Every status, in lifecycle order
    pub const ALL: [ArticleStatus; 8] = [
        ArticleStatus::Draft,
        ArticleStatus::Submitted,
        ArticleStatus::UnderReview,
        ArticleStatus::RevisionRequired,
        ArticleStatus::Resubmitted,
        ArticleStatus::Accepted,
        ArticleStatus::Rejected,
        ArticleStatus::Published,
    ];

    /// Check if a status transition is valid
    pub fn can_transition_to(&self, target: &ArticleStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Get valid next statuses from the current status
    pub fn valid_transitions(&self) -> &'static [ArticleStatus] {
        match self {
            ArticleStatus::Draft => &[ArticleStatus::Submitted],
            ArticleStatus::Submitted => &[ArticleStatus::UnderReview, ArticleStatus::Rejected],
            ArticleStatus::UnderReview => &[
                ArticleStatus::RevisionRequired,
                ArticleStatus::Accepted,
                ArticleStatus::Rejected,
            ],
            ArticleStatus::RevisionRequired => &[ArticleStatus::Resubmitted],
            ArticleStatus::Resubmitted => &[ArticleStatus::UnderReview],
            ArticleStatus::Accepted => &[ArticleStatus::Published],
            ArticleStatus::Rejected => &[],
            ArticleStatus::Published => &[],
        }
    }

    /// Check if the article is in a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArticleStatus::Rejected | ArticleStatus::Published)
    }

    /// Statuses in which authors may change content and upload files
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ArticleStatus::Draft | ArticleStatus::RevisionRequired | ArticleStatus::Resubmitted
        )
    }

    /// Statuses an article may have when its issue is published
    pub fn is_publishable(&self) -> bool {
        matches!(self, ArticleStatus::Accepted | ArticleStatus::Published)
    }

    /// Whether entering this status records a milestone date
    pub fn has_milestone(&self) -> bool {
        matches!(
            self,
            ArticleStatus::Submitted
                | ArticleStatus::Accepted
                | ArticleStatus::Rejected
                | ArticleStatus::Published
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Submitted => "submitted",
            ArticleStatus::UnderReview => "underReview",
            ArticleStatus::RevisionRequired => "revisionRequired",
            ArticleStatus::Resubmitted => "resubmitted",
            ArticleStatus::Accepted => "accepted",
            ArticleStatus::Rejected => "rejected",
            ArticleStatus::Published => "published",
        }
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "Being prepared by the authors",
            ArticleStatus::Submitted => "Submitted, awaiting editorial triage",
            ArticleStatus::UnderReview => "Under peer review",
            ArticleStatus::RevisionRequired => "Revision requested from the authors",
            ArticleStatus::Resubmitted => "Revised version submitted",
            ArticleStatus::Accepted => "Accepted for publication",
            ArticleStatus::Rejected => "Rejected",
            ArticleStatus::Published => "Published",
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArticleStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("article status", s))
    }
}
