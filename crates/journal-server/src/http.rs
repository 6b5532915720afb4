//! HTTP endpoint handlers
//!
//! Mutations are turned into [`Command`]s and executed against the shared
//! workflow; reads call the workflow directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use journal_core::{
    Actor, Article, ArticleFile, ArticleId, ArticleStatus, ArticleUpdate, Command, DoiAssignment,
    Event, FileCategory, FileFilter, FileId, FileMetadata, FileUpload, HistoryAudit,
    InvitationRequest, Issue, IssueId, IssueUpdate, NewArticle, NewIssue, Outcome, PublishRequest, Review,
    ReviewId, ReviewSubmission, StatusHistory, Store, TransitionRequest, UserId,
};

use crate::auth::AuthActor;
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Execute a command against the shared workflow
async fn run<S: Store>(state: &AppState<S>, actor: &Actor, command: Command) -> ApiResult<Outcome> {
    let name = command.name();
    let mut workflow = state.workflow.lock().await;
    match command.execute(actor, &mut *workflow) {
        Ok(outcome) => Ok(Json(outcome)),
        Err(err) => {
            tracing::debug!(command = name, kind = %err.kind(), "command rejected");
            Err(err.into())
        }
    }
}

async fn created<S: Store>(
    state: &AppState<S>,
    actor: &Actor,
    command: Command,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    run(state, actor, command).await.map(|json| (StatusCode::CREATED, json))
}

// ==================== Articles ====================

/// Create a draft article
pub async fn create_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Json(article): Json<NewArticle>,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    created(&state, &actor, Command::CreateArticle { article }).await
}

/// Get an article
pub async fn get_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Article> {
    let id = ArticleId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.article(&actor, &id)?))
}

/// Content patch with an optional version guard
#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    #[serde(flatten)]
    pub update: ArticleUpdate,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Patch article content
pub async fn update_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> ApiResult<Outcome> {
    let command = Command::UpdateArticle {
        article_id: ArticleId::parse(&id)?,
        update: request.update,
        expected_version: request.expected_version,
    };
    run(&state, &actor, command).await
}

/// Body of a transition request
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    #[serde(alias = "targetStatus")]
    pub target_status: ArticleStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, alias = "expectedVersion")]
    pub expected_version: Option<u64>,
}

/// Request a status transition
pub async fn transition_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(body): Json<TransitionBody>,
) -> ApiResult<Outcome> {
    let request = TransitionRequest {
        article_id: ArticleId::parse(&id)?,
        target: body.target_status,
        reason: body.reason,
        expected_version: body.expected_version,
    };
    run(&state, &actor, Command::Transition { request }).await
}

/// Start the next review round
pub async fn start_round<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let article_id = ArticleId::parse(&id)?;
    run(&state, &actor, Command::StartNewRound { article_id }).await
}

#[derive(Debug, Deserialize)]
pub struct AssignEditorRequest {
    pub editor_id: UserId,
}

/// Assign the handling editor
pub async fn assign_editor<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<AssignEditorRequest>,
) -> ApiResult<Outcome> {
    let command = Command::AssignEditor {
        article_id: ArticleId::parse(&id)?,
        editor_id: request.editor_id,
    };
    run(&state, &actor, command).await
}

#[derive(Debug, Deserialize)]
pub struct AssignDoiRequest {
    pub doi: String,
}

/// Set the article DOI
pub async fn assign_doi<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<AssignDoiRequest>,
) -> ApiResult<Outcome> {
    let command = Command::AssignDoi {
        article_id: ArticleId::parse(&id)?,
        doi: request.doi,
    };
    run(&state, &actor, command).await
}

/// Status history of an article
pub async fn get_history<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Vec<StatusHistory>> {
    let id = ArticleId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.status_history(&actor, &id)?))
}

/// Consistency check of an article against its history
pub async fn audit_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<HistoryAudit> {
    let id = ArticleId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.audit_article(&actor, &id)?))
}

// ==================== Files ====================

/// Upload registration body; the bytes themselves live in object storage
#[derive(Debug, Deserialize)]
pub struct RegisterFileRequest {
    #[serde(alias = "fileCategory")]
    pub category: FileCategory,
    #[serde(default)]
    pub round: Option<u32>,
    #[serde(alias = "fileMetadata")]
    pub metadata: FileMetadata,
}

/// Register an uploaded file
pub async fn register_file<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<RegisterFileRequest>,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    let upload = FileUpload {
        article_id: ArticleId::parse(&id)?,
        category: request.category,
        round: request.round,
        metadata: request.metadata,
    };
    created(&state, &actor, Command::RegisterUpload { upload }).await
}

/// List files, optionally narrowed by `round` and `category`
pub async fn list_files<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Query(filter): Query<FileFilter>,
) -> ApiResult<Vec<ArticleFile>> {
    let id = ArticleId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.list_files(&actor, &id, filter)?))
}

/// Delete a file record
pub async fn delete_file<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let file_id = FileId::parse(&id)?;
    run(&state, &actor, Command::DeleteFile { file_id }).await
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Flip a file's active flag
pub async fn set_file_active<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> ApiResult<Outcome> {
    let command = Command::SetFileActive {
        file_id: FileId::parse(&id)?,
        active: request.active,
    };
    run(&state, &actor, command).await
}

// ==================== Reviews ====================

/// Invite one reviewer
pub async fn invite_reviewer<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(invitation): Json<InvitationRequest>,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    let command = Command::InviteReviewer {
        article_id: ArticleId::parse(&id)?,
        invitation,
    };
    created(&state, &actor, command).await
}

#[derive(Debug, Deserialize)]
pub struct BatchInvitationRequest {
    pub invitations: Vec<InvitationRequest>,
}

/// Invite several reviewers; either all are created or none
pub async fn invite_reviewers<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<BatchInvitationRequest>,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    let command = Command::InviteReviewers {
        article_id: ArticleId::parse(&id)?,
        invitations: request.invitations,
    };
    created(&state, &actor, command).await
}

/// Invitations for an article
pub async fn list_article_reviews<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Vec<Review>> {
    let id = ArticleId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.reviews_for_article(&actor, &id)?))
}

/// Get one invitation
pub async fn get_review<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Review> {
    let id = ReviewId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.review(&actor, &id)?))
}

/// Invitations sent to the calling reviewer
pub async fn my_reviews<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
) -> ApiResult<Vec<Review>> {
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.reviews_for_reviewer(&actor, &actor.id)?))
}

pub async fn accept_review<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let review_id = ReviewId::parse(&id)?;
    run(&state, &actor, Command::AcceptInvitation { review_id }).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeclineRequest {
    pub reason: Option<String>,
}

pub async fn decline_review<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<DeclineRequest>,
) -> ApiResult<Outcome> {
    let command = Command::DeclineInvitation {
        review_id: ReviewId::parse(&id)?,
        reason: request.reason,
    };
    run(&state, &actor, command).await
}

pub async fn complete_review<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(submission): Json<ReviewSubmission>,
) -> ApiResult<Outcome> {
    let command = Command::CompleteReview {
        review_id: ReviewId::parse(&id)?,
        submission,
    };
    run(&state, &actor, command).await
}

pub async fn remind_reviewer<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let review_id = ReviewId::parse(&id)?;
    run(&state, &actor, Command::SendReminder { review_id }).await
}

pub async fn expire_review<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let review_id = ReviewId::parse(&id)?;
    run(&state, &actor, Command::ExpireInvitation { review_id }).await
}

// ==================== Issues ====================

/// Create an issue
pub async fn create_issue<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Json(issue): Json<NewIssue>,
) -> Result<(StatusCode, Json<Outcome>), ApiError> {
    created(&state, &actor, Command::CreateIssue { issue }).await
}

/// Get an issue; issues are public
pub async fn get_issue<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<Issue> {
    let id = IssueId::parse(&id)?;
    let workflow = state.workflow.lock().await;
    Ok(Json(workflow.issue(&id)?))
}

/// Issue edit with an optional version guard
#[derive(Debug, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(flatten)]
    pub update: IssueUpdate,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Correct an issue's title, date or numbering
pub async fn update_issue<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<UpdateIssueRequest>,
) -> ApiResult<Outcome> {
    let command = Command::UpdateIssue {
        issue_id: IssueId::parse(&id)?,
        update: request.update,
        expected_version: request.expected_version,
    };
    run(&state, &actor, command).await
}

pub async fn delete_issue<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> ApiResult<Outcome> {
    let issue_id = IssueId::parse(&id)?;
    run(&state, &actor, Command::DeleteIssue { issue_id }).await
}

#[derive(Debug, Deserialize)]
pub struct IssueArticleRequest {
    pub article_id: ArticleId,
}

pub async fn add_issue_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(request): Json<IssueArticleRequest>,
) -> ApiResult<Outcome> {
    let command = Command::AddArticleToIssue {
        issue_id: IssueId::parse(&id)?,
        article_id: request.article_id,
    };
    run(&state, &actor, command).await
}

pub async fn remove_issue_article<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path((id, article_id)): Path<(String, String)>,
) -> ApiResult<Outcome> {
    let command = Command::RemoveArticleFromIssue {
        issue_id: IssueId::parse(&id)?,
        article_id: ArticleId::parse(&article_id)?,
    };
    run(&state, &actor, command).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishBody {
    pub dois: Vec<DoiAssignment>,
}

/// Publish an issue, cascading to its articles
pub async fn publish_issue<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(body): Json<PublishBody>,
) -> ApiResult<Outcome> {
    let request = PublishRequest {
        issue_id: IssueId::parse(&id)?,
        dois: body.dois,
    };
    run(&state, &actor, Command::PublishIssue { request }).await
}

// ==================== Events & status ====================

const DEFAULT_EVENT_PAGE: usize = 100;
const MAX_EVENT_PAGE: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
    pub limit: Option<usize>,
}

/// Change log after a sequence number (editorial roles only)
pub async fn get_events<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthActor(actor): AuthActor,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Vec<Event>> {
    if !actor.role.is_editorial() {
        return Err(journal_core::JournalError::Forbidden(
            "only editorial staff may read the change log".to_string(),
        )
        .into());
    }
    let workflow = state.workflow.lock().await;
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_PAGE).min(MAX_EVENT_PAGE);
    Ok(Json(workflow.event_page(query.since, limit)?))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub last_sequence: u64,
}

/// Service status
pub async fn get_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<StatusResponse> {
    let workflow = state.workflow.lock().await;
    let last_sequence = workflow.last_sequence()?;
    Ok(Json(StatusResponse {
        service: "journal",
        version: journal_core::version(),
        last_sequence,
    }))
}
