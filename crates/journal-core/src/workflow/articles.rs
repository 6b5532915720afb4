//! Article operations: creation, content edits, status transitions, rounds

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{check_expected_version, Workflow};
use crate::actor::{access_for, require, Access, Actor, UserId};
use crate::article::{
    Article, ArticleId, ArticleStatus, ArticleUpdate, HistoryAudit, NewArticle, StatusHistory,
};
use crate::error::{ArticleError, JournalError, Result};
use crate::event::{EntityType, Event, EventPayload};
use crate::file::FileCategory;
use crate::persistence::Store;

/// A request to move an article to another status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub article_id: ArticleId,
    pub target: ArticleStatus,
    #[serde(default)]
    pub reason: Option<String>,
    /// Article version the caller last read
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl TransitionRequest {
    pub fn new(article_id: ArticleId, target: ArticleStatus) -> Self {
        Self {
            article_id,
            target,
            reason: None,
            expected_version: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

impl<S: Store> Workflow<S> {
    /// Create a draft article submitted by `actor`
    pub fn create_article(&mut self, actor: &Actor, new: NewArticle) -> Result<Article> {
        let article = Article::new(actor.id, new);
        article.validate(&self.config.article)?;

        self.in_transaction(|w| {
            w.store.insert_article(&article)?;
            w.record(
                Event::new(
                    article.id,
                    EntityType::Article,
                    EventPayload::ArticleCreated {
                        title: article.title.clone(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(article_id = %article.id, submitter = %actor.id, "article created");
        Ok(article)
    }

    /// Read an article
    pub fn article(&self, actor: &Actor, article_id: &ArticleId) -> Result<Article> {
        let article = self.load_article(article_id)?;
        if !self.can_read(actor, &article)? {
            return Err(JournalError::Forbidden(format!(
                "not allowed to view article {}",
                article_id
            )));
        }
        Ok(article)
    }

    /// Patch article content.
    ///
    /// Authors may only edit while the article is editable; editors may edit
    /// at any status. Editor notes are editorial only.
    pub fn update_article(
        &mut self,
        actor: &Actor,
        article_id: &ArticleId,
        update: ArticleUpdate,
        expected_version: Option<u64>,
    ) -> Result<Article> {
        let mut article = self.load_article(article_id)?;
        check_expected_version(format!("article {}", article.id), expected_version, article.version)?;

        let access = access_for(actor, &article);
        require(access, Access::EDIT, "edit this article")?;
        if !access.can_manage() {
            if !article.status.is_editable() {
                return Err(ArticleError::Locked {
                    id: article.id,
                    status: article.status,
                }
                .into());
            }
            if update.editor_note.is_some() {
                return Err(JournalError::Forbidden(
                    "only editors may set the editor note".to_string(),
                ));
            }
        }

        let read_version = article.version;
        let fields = article.apply_update(update);
        if fields.is_empty() {
            return Ok(article);
        }
        article.validate(&self.config.article)?;
        article.touch(Utc::now());

        self.in_transaction(|w| {
            w.store.update_article(&article, read_version)?;
            w.record(
                Event::new(
                    article.id,
                    EntityType::Article,
                    EventPayload::ArticleUpdated {
                        fields: fields.iter().map(|f| f.to_string()).collect(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(article_id = %article.id, ?fields, "article updated");
        Ok(article)
    }

    /// Move an article along the status graph.
    ///
    /// Checks run in order: existence, caller's version, authorization,
    /// legality of the edge, then the manuscript requirement for submission.
    /// The history record, the article update and the event are written in
    /// one transaction.
    pub fn request_transition(&mut self, actor: &Actor, request: TransitionRequest) -> Result<Article> {
        let article = self.load_article(&request.article_id)?;
        check_expected_version(
            format!("article {}", article.id),
            request.expected_version,
            article.version,
        )?;

        require(
            access_for(actor, &article),
            Access::TRANSITION,
            "change the status of this article",
        )?;

        if !article.status.can_transition_to(&request.target) {
            tracing::debug!(
                article_id = %article.id,
                from = %article.status,
                to = %request.target,
                "illegal transition requested"
            );
            return Err(ArticleError::InvalidTransition {
                from: article.status,
                to: request.target,
            }
            .into());
        }

        if request.target == ArticleStatus::Submitted
            && !self
                .store
                .has_active_file(&article.id, FileCategory::Manuscript)?
        {
            return Err(ArticleError::MissingManuscript(article.id).into());
        }

        self.in_transaction(|w| {
            w.apply_transition(article, actor.id, request.target, request.reason, None)
        })
    }

    /// Write a transition whose legality was already checked. Must run
    /// inside a transaction.
    pub(crate) fn apply_transition(
        &mut self,
        mut article: Article,
        changed_by: UserId,
        target: ArticleStatus,
        reason: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<Article> {
        let from = article.status;
        let read_version = article.version;

        let record = StatusHistory::new(target, changed_by, reason);
        self.store.insert_history(&record)?;

        article.enter_status(target, record.id, record.timestamp);
        self.store.update_article(&article, read_version)?;

        let mut event = Event::new(
            article.id,
            EntityType::Article,
            EventPayload::ArticleStatusChanged {
                from,
                to: target,
                reason: record.reason.clone(),
                history_id: record.id,
            },
        )
        .with_actor(changed_by);
        if let Some(correlation_id) = correlation_id {
            event = event.with_correlation(correlation_id);
        }
        self.record(event)?;

        tracing::info!(article_id = %article.id, %from, to = %target, "article status changed");
        Ok(article)
    }

    /// Begin the next review round
    pub fn start_new_round(&mut self, actor: &Actor, article_id: &ArticleId) -> Result<Article> {
        let mut article = self.load_article(article_id)?;
        require(
            access_for(actor, &article),
            Access::MANAGE,
            "start a review round for this article",
        )?;
        if article.status.is_terminal() {
            return Err(ArticleError::Locked {
                id: article.id,
                status: article.status,
            }
            .into());
        }

        let read_version = article.version;
        article.current_round += 1;
        article.touch(Utc::now());

        self.in_transaction(|w| {
            w.store.update_article(&article, read_version)?;
            w.record(
                Event::new(
                    article.id,
                    EntityType::Article,
                    EventPayload::RoundStarted {
                        round: article.current_round,
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(article_id = %article.id, round = article.current_round, "review round started");
        Ok(article)
    }

    /// Assign the handling editor (admin or chief editor only)
    pub fn assign_editor(
        &mut self,
        actor: &Actor,
        article_id: &ArticleId,
        editor_id: UserId,
    ) -> Result<Article> {
        if !actor.role.is_administrative() {
            return Err(JournalError::Forbidden(
                "only admins and chief editors assign editors".to_string(),
            ));
        }
        let mut article = self.load_article(article_id)?;
        let read_version = article.version;
        article.editor_id = Some(editor_id);
        article.touch(Utc::now());

        self.in_transaction(|w| {
            w.store.update_article(&article, read_version)?;
            w.record(
                Event::new(
                    article.id,
                    EntityType::Article,
                    EventPayload::EditorAssigned { editor_id },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(article_id = %article.id, %editor_id, "editor assigned");
        Ok(article)
    }

    /// Set the article's DOI. DOIs are unique across all articles.
    pub fn assign_doi(&mut self, actor: &Actor, article_id: &ArticleId, doi: &str) -> Result<Article> {
        let mut article = self.load_article(article_id)?;
        require(access_for(actor, &article), Access::MANAGE, "assign a DOI")?;

        let doi = doi.trim();
        if doi.is_empty() {
            return Err(JournalError::Validation("DOI must not be empty".to_string()));
        }
        if let Some(holder) = self.store.find_article_by_doi(doi)? {
            if holder.id != article.id {
                return Err(ArticleError::DuplicateDoi(doi.to_string()).into());
            }
            return Ok(article);
        }

        let read_version = article.version;
        article.doi = Some(doi.to_string());
        article.touch(Utc::now());

        self.in_transaction(|w| {
            w.store.update_article(&article, read_version)?;
            w.record(
                Event::new(
                    article.id,
                    EntityType::Article,
                    EventPayload::DoiAssigned {
                        doi: doi.to_string(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(article_id = %article.id, doi, "DOI assigned");
        Ok(article)
    }

    /// Status history in order of occurrence
    pub fn status_history(&self, actor: &Actor, article_id: &ArticleId) -> Result<Vec<StatusHistory>> {
        let article = self.load_article(article_id)?;
        require(access_for(actor, &article), Access::VIEW, "view this article's history")?;

        let mut records = Vec::with_capacity(article.status_history.len());
        for id in &article.status_history {
            match self.store.get_history(id)? {
                Some(record) => records.push(record),
                None => tracing::warn!(article_id = %article.id, history_id = %id, "history record missing"),
            }
        }
        Ok(records)
    }

    /// Check an article against its history log
    pub fn audit_article(&self, actor: &Actor, article_id: &ArticleId) -> Result<HistoryAudit> {
        let article = self.load_article(article_id)?;
        require(access_for(actor, &article), Access::VIEW, "audit this article")?;

        let mut records = Vec::with_capacity(article.status_history.len());
        for id in &article.status_history {
            if let Some(record) = self.store.get_history(id)? {
                records.push(record);
            }
        }

        let audit = HistoryAudit::check(&article, &records);
        if let HistoryAudit::Inconsistent { problems } = &audit {
            tracing::warn!(article_id = %article.id, ?problems, "article history is inconsistent");
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::error::ErrorKind;
    use crate::file::{FileMetadata, FileUpload};
    use crate::persistence::InMemoryStore;

    fn workflow() -> Workflow<InMemoryStore> {
        Workflow::with_store(InMemoryStore::new())
    }

    fn new_article() -> NewArticle {
        NewArticle {
            title: "Lifecycle of a Manuscript".to_string(),
            abstract_text: "How papers move.".to_string(),
            keywords: vec!["peer review".into(), "publishing".into(), "workflow".into()],
            language: "en".to_string(),
            ..Default::default()
        }
    }

    fn upload_manuscript(w: &mut Workflow<InMemoryStore>, actor: &Actor, article_id: ArticleId) {
        w.register_upload(
            actor,
            FileUpload {
                article_id,
                category: FileCategory::Manuscript,
                round: None,
                metadata: FileMetadata {
                    original_name: "paper.pdf".into(),
                    file_url: "https://files.example.org/paper.pdf".into(),
                    ..Default::default()
                },
            },
        )
        .unwrap();
    }

    #[test]
    fn test_create_article_validates_keywords() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let mut new = new_article();
        new.keywords.truncate(2);
        assert_eq!(
            w.create_article(&author, new).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_submit_requires_manuscript() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let article = w.create_article(&author, new_article()).unwrap();

        let err = w
            .request_transition(&author, TransitionRequest::new(article.id, ArticleStatus::Submitted))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingManuscript);

        upload_manuscript(&mut w, &author, article.id);
        let submitted = w
            .request_transition(&author, TransitionRequest::new(article.id, ArticleStatus::Submitted))
            .unwrap();
        assert_eq!(submitted.status, ArticleStatus::Submitted);
        assert!(submitted.milestones.submitted_date.is_some());
        assert_eq!(submitted.status_history.len(), 1);
    }

    #[test]
    fn test_stranger_cannot_transition() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let article = w.create_article(&author, new_article()).unwrap();
        let stranger = Actor::with_role(Role::Editor);
        let err = w
            .request_transition(&stranger, TransitionRequest::new(article.id, ArticleStatus::Submitted))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_stale_expected_version() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let article = w.create_article(&author, new_article()).unwrap();
        upload_manuscript(&mut w, &author, article.id);
        let err = w
            .request_transition(
                &author,
                TransitionRequest::new(article.id, ArticleStatus::Submitted).expecting(7),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_author_locked_outside_editable_states() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let admin = Actor::with_role(Role::Admin);
        let article = w.create_article(&author, new_article()).unwrap();
        upload_manuscript(&mut w, &author, article.id);
        w.request_transition(&author, TransitionRequest::new(article.id, ArticleStatus::Submitted))
            .unwrap();

        let update = ArticleUpdate {
            title: Some("Sneaky edit".into()),
            ..Default::default()
        };
        let err = w
            .update_article(&author, &article.id, update.clone(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArticleLocked);

        let edited = w.update_article(&admin, &article.id, update, None).unwrap();
        assert_eq!(edited.title, "Sneaky edit");
    }

    #[test]
    fn test_start_new_round() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let chief = Actor::with_role(Role::ChiefEditor);
        let article = w.create_article(&author, new_article()).unwrap();

        assert_eq!(
            w.start_new_round(&author, &article.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        let advanced = w.start_new_round(&chief, &article.id).unwrap();
        assert_eq!(advanced.current_round, 2);
    }

    #[test]
    fn test_assign_editor_grants_management() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let admin = Actor::with_role(Role::Admin);
        let editor = Actor::with_role(Role::Editor);
        let article = w.create_article(&author, new_article()).unwrap();

        assert_eq!(
            w.assign_editor(&editor, &article.id, editor.id).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        w.assign_editor(&admin, &article.id, editor.id).unwrap();
        assert!(w.start_new_round(&editor, &article.id).is_ok());
    }

    #[test]
    fn test_assign_doi_unique() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let admin = Actor::with_role(Role::Admin);
        let first = w.create_article(&author, new_article()).unwrap();
        let second = w.create_article(&author, new_article()).unwrap();

        w.assign_doi(&admin, &first.id, "10.5555/journal.1").unwrap();
        let err = w.assign_doi(&admin, &second.id, "10.5555/journal.1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDoi);
    }

    #[test]
    fn test_history_and_audit() {
        let mut w = workflow();
        let author = Actor::with_role(Role::Author);
        let admin = Actor::with_role(Role::Admin);
        let article = w.create_article(&author, new_article()).unwrap();
        upload_manuscript(&mut w, &author, article.id);
        w.request_transition(&author, TransitionRequest::new(article.id, ArticleStatus::Submitted))
            .unwrap();
        w.request_transition(
            &admin,
            TransitionRequest::new(article.id, ArticleStatus::Rejected).with_reason("Out of scope"),
        )
        .unwrap();

        let history = w.status_history(&author, &article.id).unwrap();
        let statuses: Vec<_> = history.iter().map(|h| h.status).collect();
        assert_eq!(statuses, vec![ArticleStatus::Submitted, ArticleStatus::Rejected]);
        assert_eq!(history[1].reason.as_deref(), Some("Out of scope"));
        assert!(w.audit_article(&admin, &article.id).unwrap().is_consistent());
    }
}
