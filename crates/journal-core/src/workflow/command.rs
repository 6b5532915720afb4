//! Command dispatch for workflow mutations

use serde::{Deserialize, Serialize};

use super::{TransitionRequest, Workflow};
use crate::actor::{Actor, UserId};
use crate::article::{Article, ArticleId, ArticleUpdate, NewArticle};
use crate::error::Result;
use crate::file::{ArticleFile, FileId, FileUpload};
use crate::issue::{Issue, IssueId, IssueUpdate, NewIssue, PublishRequest};
use crate::persistence::Store;
use crate::review::{InvitationRequest, Review, ReviewId, ReviewSubmission};

/// Mutating operations that can be executed against a [`Workflow`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Create a draft article
    CreateArticle { article: NewArticle },

    /// Patch article content
    UpdateArticle {
        article_id: ArticleId,
        update: ArticleUpdate,
        #[serde(default)]
        expected_version: Option<u64>,
    },

    /// Move an article along the status graph
    Transition { request: TransitionRequest },

    /// Begin the next review round
    StartNewRound { article_id: ArticleId },

    AssignEditor {
        article_id: ArticleId,
        editor_id: UserId,
    },

    AssignDoi { article_id: ArticleId, doi: String },

    /// Register an uploaded file
    RegisterUpload { upload: FileUpload },

    DeleteFile { file_id: FileId },

    SetFileActive { file_id: FileId, active: bool },

    /// Invite a single reviewer
    InviteReviewer {
        article_id: ArticleId,
        invitation: InvitationRequest,
    },

    /// Invite several reviewers, all or nothing
    InviteReviewers {
        article_id: ArticleId,
        invitations: Vec<InvitationRequest>,
    },

    AcceptInvitation { review_id: ReviewId },

    DeclineInvitation {
        review_id: ReviewId,
        #[serde(default)]
        reason: Option<String>,
    },

    CompleteReview {
        review_id: ReviewId,
        submission: ReviewSubmission,
    },

    SendReminder { review_id: ReviewId },

    ExpireInvitation { review_id: ReviewId },

    CreateIssue { issue: NewIssue },

    /// Correct title, date or numbering of an unpublished issue
    UpdateIssue {
        issue_id: IssueId,
        update: IssueUpdate,
        #[serde(default)]
        expected_version: Option<u64>,
    },

    AddArticleToIssue {
        issue_id: IssueId,
        article_id: ArticleId,
    },

    RemoveArticleFromIssue {
        issue_id: IssueId,
        article_id: ArticleId,
    },

    DeleteIssue { issue_id: IssueId },

    /// Publish an issue and cascade to its articles
    PublishIssue { request: PublishRequest },
}

/// The record a command produced
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Article(Article),
    File(ArticleFile),
    Review(Review),
    Reviews(Vec<Review>),
    Issue(Issue),
}

impl Command {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateArticle { .. } => "create_article",
            Command::UpdateArticle { .. } => "update_article",
            Command::Transition { .. } => "transition",
            Command::StartNewRound { .. } => "start_new_round",
            Command::AssignEditor { .. } => "assign_editor",
            Command::AssignDoi { .. } => "assign_doi",
            Command::RegisterUpload { .. } => "register_upload",
            Command::DeleteFile { .. } => "delete_file",
            Command::SetFileActive { .. } => "set_file_active",
            Command::InviteReviewer { .. } => "invite_reviewer",
            Command::InviteReviewers { .. } => "invite_reviewers",
            Command::AcceptInvitation { .. } => "accept_invitation",
            Command::DeclineInvitation { .. } => "decline_invitation",
            Command::CompleteReview { .. } => "complete_review",
            Command::SendReminder { .. } => "send_reminder",
            Command::ExpireInvitation { .. } => "expire_invitation",
            Command::CreateIssue { .. } => "create_issue",
            Command::UpdateIssue { .. } => "update_issue",
            Command::AddArticleToIssue { .. } => "add_article_to_issue",
            Command::RemoveArticleFromIssue { .. } => "remove_article_from_issue",
            Command::DeleteIssue { .. } => "delete_issue",
            Command::PublishIssue { .. } => "publish_issue",
        }
    }

    /// Execute the command as `actor`
    pub fn execute<S: Store>(self, actor: &Actor, workflow: &mut Workflow<S>) -> Result<Outcome> {
        tracing::debug!(command = self.name(), actor = %actor.id, role = %actor.role, "executing command");
        match self {
            Command::CreateArticle { article } => {
                workflow.create_article(actor, article).map(Outcome::Article)
            }
            Command::UpdateArticle {
                article_id,
                update,
                expected_version,
            } => workflow
                .update_article(actor, &article_id, update, expected_version)
                .map(Outcome::Article),
            Command::Transition { request } => {
                workflow.request_transition(actor, request).map(Outcome::Article)
            }
            Command::StartNewRound { article_id } => {
                workflow.start_new_round(actor, &article_id).map(Outcome::Article)
            }
            Command::AssignEditor {
                article_id,
                editor_id,
            } => workflow
                .assign_editor(actor, &article_id, editor_id)
                .map(Outcome::Article),
            Command::AssignDoi { article_id, doi } => {
                workflow.assign_doi(actor, &article_id, &doi).map(Outcome::Article)
            }
            Command::RegisterUpload { upload } => {
                workflow.register_upload(actor, upload).map(Outcome::File)
            }
            Command::DeleteFile { file_id } => {
                workflow.delete_file(actor, &file_id).map(Outcome::File)
            }
            Command::SetFileActive { file_id, active } => workflow
                .set_file_active(actor, &file_id, active)
                .map(Outcome::File),
            Command::InviteReviewer {
                article_id,
                invitation,
            } => workflow
                .create_invitation(actor, &article_id, invitation)
                .map(Outcome::Review),
            Command::InviteReviewers {
                article_id,
                invitations,
            } => workflow
                .create_invitations(actor, &article_id, invitations)
                .map(Outcome::Reviews),
            Command::AcceptInvitation { review_id } => {
                workflow.accept_invitation(actor, &review_id).map(Outcome::Review)
            }
            Command::DeclineInvitation { review_id, reason } => workflow
                .decline_invitation(actor, &review_id, reason.as_deref())
                .map(Outcome::Review),
            Command::CompleteReview {
                review_id,
                submission,
            } => workflow
                .complete_review(actor, &review_id, submission)
                .map(Outcome::Review),
            Command::SendReminder { review_id } => {
                workflow.send_reminder(actor, &review_id).map(Outcome::Review)
            }
            Command::ExpireInvitation { review_id } => {
                workflow.expire_invitation(actor, &review_id).map(Outcome::Review)
            }
            Command::CreateIssue { issue } => workflow.create_issue(actor, issue).map(Outcome::Issue),
            Command::UpdateIssue {
                issue_id,
                update,
                expected_version,
            } => workflow
                .update_issue(actor, &issue_id, update, expected_version)
                .map(Outcome::Issue),
            Command::AddArticleToIssue {
                issue_id,
                article_id,
            } => workflow
                .add_article_to_issue(actor, &issue_id, &article_id)
                .map(Outcome::Issue),
            Command::RemoveArticleFromIssue {
                issue_id,
                article_id,
            } => workflow
                .remove_article_from_issue(actor, &issue_id, &article_id)
                .map(Outcome::Issue),
            Command::DeleteIssue { issue_id } => {
                workflow.delete_issue(actor, &issue_id).map(Outcome::Issue)
            }
            Command::PublishIssue { request } => {
                workflow.publish_issue(actor, request).map(Outcome::Issue)
            }
        }
    }
}
