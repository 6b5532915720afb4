//! Append-only log of workflow events
//!
//! Every mutating operation appends its events in the same store transaction
//! as the records it changes, so the log never runs ahead of or behind the
//! data it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::UserId;
use crate::article::{ArticleStatus, StatusHistoryId};
use crate::file::FileCategory;
use crate::review::Recommendation;

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event in the journal workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: EventId,
    /// Sequence number for ordering, assigned by the store
    pub sequence: u64,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// ID of the entity this event affects
    pub entity_id: String,
    /// Type of entity
    pub entity_type: EntityType,
    /// Event payload
    pub payload: EventPayload,
    /// User that triggered this event
    pub actor_id: Option<UserId>,
    /// Groups the events of one multi-record operation
    pub correlation_id: Option<String>,
}

impl Event {
    /// Create a new event
    pub fn new(entity_id: impl ToString, entity_type: EntityType, payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            sequence: 0,
            timestamp: Utc::now(),
            entity_id: entity_id.to_string(),
            entity_type,
            payload,
            actor_id: None,
            correlation_id: None,
        }
    }

    /// Set the actor ID
    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set the correlation ID
    pub fn with_correlation(mut self, correlation_id: impl ToString) -> Self {
        self.correlation_id = Some(correlation_id.to_string());
        self
    }
}

/// Type of entity an event affects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Article,
    File,
    Review,
    Issue,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Article => "article",
            EntityType::File => "file",
            EntityType::Review => "review",
            EntityType::Issue => "issue",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload containing the actual event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Article events
    ArticleCreated {
        title: String,
    },
    ArticleUpdated {
        fields: Vec<String>,
    },
    ArticleStatusChanged {
        from: ArticleStatus,
        to: ArticleStatus,
        reason: Option<String>,
        history_id: StatusHistoryId,
    },
    EditorAssigned {
        editor_id: UserId,
    },
    RoundStarted {
        round: u32,
    },
    DoiAssigned {
        doi: String,
    },

    // File events
    FileRegistered {
        article_id: String,
        category: FileCategory,
        round: u32,
        file_version: u32,
    },
    FileActivationChanged {
        is_active: bool,
    },
    FileDeleted {
        article_id: String,
    },

    // Review events
    InvitationCreated {
        article_id: String,
        reviewer_id: UserId,
        round: u32,
    },
    InvitationAccepted,
    InvitationDeclined {
        reason: String,
    },
    ReviewCompleted {
        recommendation: Recommendation,
    },
    ReminderSent {
        reminder_count: u32,
    },
    InvitationExpired,

    // Issue events
    IssueCreated {
        title: String,
        volume_number: u32,
        issue_number: u32,
    },
    IssueUpdated {
        title: String,
        volume_number: u32,
        issue_number: u32,
    },
    IssueArticleAdded {
        article_id: String,
    },
    IssueArticleRemoved {
        article_id: String,
    },
    IssueDeleted,
    IssuePublished {
        article_count: usize,
    },
}

impl EventPayload {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EventPayload::ArticleCreated { title } => format!("Article created: {}", title),
            EventPayload::ArticleUpdated { fields } => {
                format!("Article updated: {}", fields.join(", "))
            }
            EventPayload::ArticleStatusChanged { from, to, .. } => {
                format!("Status changed: {} → {}", from, to)
            }
            EventPayload::EditorAssigned { editor_id } => format!("Editor assigned: {}", editor_id),
            EventPayload::RoundStarted { round } => format!("Review round {} started", round),
            EventPayload::DoiAssigned { doi } => format!("DOI assigned: {}", doi),
            EventPayload::FileRegistered {
                category,
                round,
                file_version,
                ..
            } => format!("{} v{} uploaded for round {}", category, file_version, round),
            EventPayload::FileActivationChanged { is_active } => {
                if *is_active {
                    "File activated".to_string()
                } else {
                    "File deactivated".to_string()
                }
            }
            EventPayload::FileDeleted { .. } => "File deleted".to_string(),
            EventPayload::InvitationCreated { reviewer_id, round, .. } => {
                format!("Reviewer {} invited for round {}", reviewer_id, round)
            }
            EventPayload::InvitationAccepted => "Invitation accepted".to_string(),
            EventPayload::InvitationDeclined { reason } => {
                format!("Invitation declined: {}", reason)
            }
            EventPayload::ReviewCompleted { recommendation } => {
                format!("Review completed: {}", recommendation)
            }
            EventPayload::ReminderSent { reminder_count } => {
                format!("Reminder #{} sent", reminder_count)
            }
            EventPayload::InvitationExpired => "Invitation expired".to_string(),
            EventPayload::IssueCreated { title, .. } => format!("Issue created: {}", title),
            EventPayload::IssueUpdated {
                volume_number,
                issue_number,
                ..
            } => format!("Issue updated: Vol.{} No.{}", volume_number, issue_number),
            EventPayload::IssueArticleAdded { article_id } => {
                format!("Article {} added to issue", article_id)
            }
            EventPayload::IssueArticleRemoved { article_id } => {
                format!("Article {} removed from issue", article_id)
            }
            EventPayload::IssueDeleted => "Issue deleted".to_string(),
            EventPayload::IssuePublished { article_count } => {
                format!("Issue published with {} article(s)", article_count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let actor = UserId::new();
        let event = Event::new(
            "article-1",
            EntityType::Article,
            EventPayload::RoundStarted { round: 2 },
        )
        .with_actor(actor)
        .with_correlation("issue-9");

        assert_eq!(event.entity_id, "article-1");
        assert_eq!(event.actor_id, Some(actor));
        assert_eq!(event.correlation_id.as_deref(), Some("issue-9"));
        assert_eq!(event.sequence, 0);
    }

    #[test]
    fn test_payload_description() {
        let payload = EventPayload::ArticleStatusChanged {
            from: ArticleStatus::Submitted,
            to: ArticleStatus::UnderReview,
            reason: None,
            history_id: StatusHistoryId::new(),
        };
        assert!(payload.description().contains("submitted"));
        assert!(payload.description().contains("underReview"));
    }

    #[test]
    fn test_payload_serializes() {
        let payload = EventPayload::FileRegistered {
            article_id: "a".into(),
            category: FileCategory::Manuscript,
            round: 1,
            file_version: 2,
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
