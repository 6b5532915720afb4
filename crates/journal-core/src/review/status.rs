//! Review invitation status and reviewer recommendation

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Status of a review invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewStatus {
    /// Waiting for the reviewer to respond
    #[default]
    Invited,
    /// Reviewer agreed to review
    Accepted,
    /// Reviewer declined
    Declined,
    /// Review submitted
    Completed,
    /// Timed out (set by an external sweep)
    Expired,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 5] = [
        ReviewStatus::Invited,
        ReviewStatus::Accepted,
        ReviewStatus::Declined,
        ReviewStatus::Completed,
        ReviewStatus::Expired,
    ];

    /// Still awaiting some action from the reviewer
    pub fn is_open(&self) -> bool {
        matches!(self, ReviewStatus::Invited | ReviewStatus::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Reviewers in these states may read the article's files
    pub fn grants_file_access(&self) -> bool {
        matches!(self, ReviewStatus::Accepted | ReviewStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Invited => "invited",
            ReviewStatus::Accepted => "accepted",
            ReviewStatus::Declined => "declined",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("review status", s))
    }
}

/// The reviewer's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Resubmit,
    RejectSuggestElsewhere,
    Reject,
    SeeComments,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::MinorRevision => "minorRevision",
            Recommendation::MajorRevision => "majorRevision",
            Recommendation::Resubmit => "resubmit",
            Recommendation::RejectSuggestElsewhere => "rejectSuggestElsewhere",
            Recommendation::Reject => "reject",
            Recommendation::SeeComments => "seeComments",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Recommendation::Accept),
            "minorRevision" => Ok(Recommendation::MinorRevision),
            "majorRevision" => Ok(Recommendation::MajorRevision),
            "resubmit" => Ok(Recommendation::Resubmit),
            "rejectSuggestElsewhere" => Ok(Recommendation::RejectSuggestElsewhere),
            "reject" => Ok(Recommendation::Reject),
            "seeComments" => Ok(Recommendation::SeeComments),
            _ => Err(ParseEnumError::new("recommendation", s)),
        }
    }
}
