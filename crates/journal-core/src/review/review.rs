//! Review invitations and their sub-lifecycle

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Recommendation, ReviewStatus};
use crate::actor::UserId;
use crate::article::ArticleId;
use crate::config::ReviewConfig;
use crate::error::{ErrorKind, JournalError, Result, ReviewError};

/// Unique identifier for a review invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid review id {:?}: {}", s, e)))
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reviewer comments, split by audience
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComments {
    pub for_author: Option<String>,
    pub for_editor: Option<String>,
}

/// One reviewer invited to one article.
///
/// At most one exists per (article, reviewer) pair, whatever its round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub article_id: ArticleId,
    pub reviewer_id: UserId,
    /// Article round at invitation time; never updated afterwards
    pub round: u32,
    pub status: ReviewStatus,
    pub invited_by: UserId,
    pub invited_at: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub review_deadline: DateTime<Utc>,
    pub response_date: Option<DateTime<Utc>>,
    pub submitted_date: Option<DateTime<Utc>>,
    pub recommendation: Option<Recommendation>,
    pub comments: ReviewComments,
    pub reminder_count: u32,
    pub last_reminder_date: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub version: u64,
}

impl Review {
    pub fn new(
        article_id: ArticleId,
        reviewer_id: UserId,
        round: u32,
        invited_by: UserId,
        response_deadline: DateTime<Utc>,
        review_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            article_id,
            reviewer_id,
            round,
            status: ReviewStatus::Invited,
            invited_by,
            invited_at: Utc::now(),
            response_deadline,
            review_deadline,
            response_date: None,
            submitted_date: None,
            recommendation: None,
            comments: ReviewComments::default(),
            reminder_count: 0,
            last_reminder_date: None,
            decline_reason: None,
            version: 0,
        }
    }

    /// Reviewer agrees to review
    pub fn accept(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.require_invited()?;
        self.status = ReviewStatus::Accepted;
        self.response_date = Some(at);
        self.version += 1;
        Ok(())
    }

    /// Reviewer declines; a non-blank reason is required
    pub fn decline(&mut self, reason: Option<&str>, at: DateTime<Utc>) -> Result<()> {
        self.require_invited()?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ReviewError::MissingReason)?;
        self.status = ReviewStatus::Declined;
        self.decline_reason = Some(reason.to_string());
        self.response_date = Some(at);
        self.version += 1;
        Ok(())
    }

    /// Reviewer submits the review
    pub fn complete(&mut self, submission: ReviewSubmission, at: DateTime<Utc>) -> Result<()> {
        if self.status != ReviewStatus::Accepted {
            return Err(ReviewError::NotAccepted {
                id: self.id,
                status: self.status,
            }
            .into());
        }
        let recommendation = submission
            .recommendation
            .ok_or(ReviewError::MissingRecommendation)?;
        self.status = ReviewStatus::Completed;
        self.recommendation = Some(recommendation);
        self.comments = ReviewComments {
            for_author: submission.comments_for_author,
            for_editor: submission.comments_for_editor,
        };
        self.submitted_date = Some(at);
        self.version += 1;
        Ok(())
    }

    /// Record a reminder; status is unchanged
    pub fn remind(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.is_open() {
            return Err(ReviewError::InvalidReminderState {
                id: self.id,
                status: self.status,
            }
            .into());
        }
        self.reminder_count += 1;
        self.last_reminder_date = Some(at);
        self.version += 1;
        Ok(())
    }

    /// Time out an open invitation
    pub fn expire(&mut self) -> Result<()> {
        if !self.status.is_open() {
            return Err(self.already_responded());
        }
        self.status = ReviewStatus::Expired;
        self.version += 1;
        Ok(())
    }

    fn require_invited(&self) -> Result<()> {
        if self.status == ReviewStatus::Invited {
            Ok(())
        } else {
            Err(self.already_responded())
        }
    }

    fn already_responded(&self) -> JournalError {
        ReviewError::AlreadyResponded {
            id: self.id,
            status: self.status,
        }
        .into()
    }
}

/// One reviewer to invite, with optional explicit deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub reviewer_id: UserId,
    #[serde(default)]
    pub response_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_deadline: Option<DateTime<Utc>>,
}

impl InvitationRequest {
    pub fn new(reviewer_id: UserId) -> Self {
        Self {
            reviewer_id,
            response_deadline: None,
            review_deadline: None,
        }
    }

    /// Resolve deadlines, filling gaps from config
    pub fn deadlines(
        &self,
        config: &ReviewConfig,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let response = match self.response_deadline {
            Some(deadline) => deadline,
            None => days_from(now, config.default_response_days)?,
        };
        let review = match self.review_deadline {
            Some(deadline) => deadline,
            None => days_from(now, config.default_review_days)?,
        };
        if response > review {
            return Err(JournalError::Validation(format!(
                "response deadline {} is after review deadline {}",
                response, review
            )));
        }
        Ok((response, review))
    }
}

fn days_from(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| {
            JournalError::Validation(format!("a deadline {} days out is out of range", days))
        })
}

/// Why one reviewer in a batch could not be invited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationFailure {
    pub reviewer_id: UserId,
    pub kind: ErrorKind,
    pub message: String,
}

impl InvitationFailure {
    pub fn new(reviewer_id: UserId, err: &JournalError) -> Self {
        Self {
            reviewer_id,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == ErrorKind::DuplicateInvitation
    }
}

/// Payload for completing a review
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSubmission {
    pub recommendation: Option<Recommendation>,
    pub comments_for_author: Option<String>,
    pub comments_for_editor: Option<String>,
}
