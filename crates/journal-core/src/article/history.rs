//! Status history log
//!
//! Every status change appends one immutable [`StatusHistory`] record. The
//! article holds the ordered list of record ids; records never point back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Article, ArticleStatus};
use crate::actor::UserId;

/// Unique identifier for a status history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusHistoryId(pub Uuid);

impl StatusHistoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StatusHistoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatusHistoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: StatusHistoryId,
    /// Status entered
    pub status: ArticleStatus,
    pub changed_by: UserId,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusHistory {
    pub fn new(status: ArticleStatus, changed_by: UserId, reason: Option<String>) -> Self {
        Self {
            id: StatusHistoryId::new(),
            status,
            changed_by,
            // Blank reasons are stored as absent
            reason: reason.filter(|r| !r.trim().is_empty()),
            timestamp: Utc::now(),
        }
    }
}

/// Result of checking an article against its history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum HistoryAudit {
    Consistent,
    Inconsistent { problems: Vec<String> },
}

impl HistoryAudit {
    pub fn is_consistent(&self) -> bool {
        matches!(self, HistoryAudit::Consistent)
    }

    /// Compare `article` with the history records that could be loaded for it.
    ///
    /// Checks that every referenced id resolves, that the last recorded status
    /// is the article's status (a draft may have no history), and that each
    /// milestone date is present exactly when its status appears in the log.
    pub fn check(article: &Article, records: &[StatusHistory]) -> Self {
        let by_id: HashMap<StatusHistoryId, &StatusHistory> =
            records.iter().map(|r| (r.id, r)).collect();
        let mut problems = Vec::new();

        let mut ordered = Vec::with_capacity(article.status_history.len());
        for id in &article.status_history {
            match by_id.get(id) {
                Some(record) => ordered.push(*record),
                None => problems.push(format!("history record {} is missing", id)),
            }
        }

        match ordered.last() {
            Some(last) if last.status != article.status => problems.push(format!(
                "article status is {} but the last history entry is {}",
                article.status, last.status
            )),
            None if article.status != ArticleStatus::Draft && problems.is_empty() => {
                problems.push(format!(
                    "article status is {} but it has no history",
                    article.status
                ))
            }
            _ => {}
        }

        for status in ArticleStatus::ALL.into_iter().filter(|s| s.has_milestone()) {
            let entered = ordered.iter().any(|r| r.status == status);
            let dated = article.milestones.get(status).is_some();
            if entered && !dated {
                problems.push(format!("{} was entered but has no milestone date", status));
            } else if dated && !entered {
                problems.push(format!("{} has a milestone date but was never entered", status));
            }
        }

        if problems.is_empty() {
            HistoryAudit::Consistent
        } else {
            HistoryAudit::Inconsistent { problems }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::NewArticle;

    fn draft() -> Article {
        Article::new(UserId::new(), NewArticle::default())
    }

    #[test]
    fn test_draft_without_history_is_consistent() {
        assert!(HistoryAudit::check(&draft(), &[]).is_consistent());
    }

    #[test]
    fn test_transition_is_consistent() {
        let mut article = draft();
        let record = StatusHistory::new(ArticleStatus::Submitted, article.submitter_id, None);
        article.enter_status(record.status, record.id, record.timestamp);
        assert!(HistoryAudit::check(&article, &[record]).is_consistent());
    }

    #[test]
    fn test_orphan_history_is_detected() {
        // History written but the article update never landed
        let article = draft();
        let mut moved = article.clone();
        let record = StatusHistory::new(ArticleStatus::Submitted, article.submitter_id, None);
        moved.enter_status(record.status, record.id, record.timestamp);

        let audit = HistoryAudit::check(&moved, &[]);
        match audit {
            HistoryAudit::Inconsistent { problems } => {
                assert!(problems.iter().any(|p| p.contains("missing")));
            }
            HistoryAudit::Consistent => panic!("expected inconsistency"),
        }
    }

    #[test]
    fn test_status_mismatch_is_detected() {
        let mut article = draft();
        let record = StatusHistory::new(ArticleStatus::Submitted, article.submitter_id, None);
        article.enter_status(record.status, record.id, record.timestamp);
        article.status = ArticleStatus::UnderReview;
        assert!(!HistoryAudit::check(&article, &[record]).is_consistent());
    }

    #[test]
    fn test_blank_reason_dropped() {
        let record = StatusHistory::new(ArticleStatus::Rejected, UserId::new(), Some("  ".into()));
        assert_eq!(record.reason, None);
    }
}
