//! File version store operations

use chrono::Utc;

use super::Workflow;
use crate::actor::{access_for, require, Access, Actor, Role};
use crate::article::{ArticleId, ArticleStatus};
use crate::error::{ArticleError, JournalError, Result};
use crate::event::{EntityType, Event, EventPayload};
use crate::file::{sort_listing, ArticleFile, FileCategory, FileFilter, FileId, FileUpload};
use crate::persistence::Store;

impl<S: Store> Workflow<S> {
    /// Register an uploaded file.
    ///
    /// A new manuscript replaces the round's previous manuscript: the group
    /// is deactivated before the new record is inserted, all in one
    /// transaction.
    pub fn register_upload(&mut self, actor: &Actor, upload: FileUpload) -> Result<ArticleFile> {
        let article = self.load_article(&upload.article_id)?;
        let access = access_for(actor, &article);
        require(access, Access::UPLOAD, "upload files for this article")?;
        if !access.can_manage() && !article.status.is_editable() {
            return Err(ArticleError::Locked {
                id: article.id,
                status: article.status,
            }
            .into());
        }

        let round = upload.round.unwrap_or(article.current_round);
        if round == 0 || round > article.current_round {
            return Err(JournalError::Validation(format!(
                "round {} is outside 1..={}",
                round, article.current_round
            )));
        }
        upload.metadata.validate()?;

        let file = self.in_transaction(|w| {
            if upload.category == FileCategory::Manuscript {
                let replaced =
                    w.store
                        .deactivate_files(&article.id, FileCategory::Manuscript, round)?;
                if replaced > 0 {
                    tracing::debug!(article_id = %article.id, round, replaced, "previous manuscript deactivated");
                }
            }

            let file = ArticleFile {
                id: FileId::new(),
                article_id: article.id,
                category: upload.category,
                round,
                file_version: w.store.next_file_version(&article.id, upload.category, round)?,
                is_active: true,
                uploaded_by: actor.id,
                metadata: upload.metadata,
                uploaded_at: Utc::now(),
            };
            w.store.insert_file(&file)?;
            w.record(
                Event::new(
                    file.id,
                    EntityType::File,
                    EventPayload::FileRegistered {
                        article_id: article.id.to_string(),
                        category: file.category,
                        round,
                        file_version: file.file_version,
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(file)
        })?;

        tracing::info!(
            article_id = %article.id,
            file_id = %file.id,
            category = %file.category,
            round,
            version = file.file_version,
            "file registered"
        );
        Ok(file)
    }

    /// Files of an article: newest round first, then category, then newest
    /// upload
    pub fn list_files(
        &self,
        actor: &Actor,
        article_id: &ArticleId,
        filter: FileFilter,
    ) -> Result<Vec<ArticleFile>> {
        let article = self.load_article(article_id)?;
        if !self.can_read(actor, &article)? {
            return Err(JournalError::Forbidden(format!(
                "not allowed to view files of article {}",
                article_id
            )));
        }

        let mut files: Vec<ArticleFile> = self
            .store
            .files_for_article(article_id)?
            .into_iter()
            .filter(|f| filter.matches(f))
            .collect();
        sort_listing(&mut files);
        Ok(files)
    }

    /// Delete a file record: authors while the article is a draft, or admins
    pub fn delete_file(&mut self, actor: &Actor, file_id: &FileId) -> Result<ArticleFile> {
        let file = self.load_file(file_id)?;
        let article = self.load_article(&file.article_id)?;

        let allowed = actor.role == Role::Admin
            || (article.is_author(&actor.id) && article.status == ArticleStatus::Draft);
        if !allowed {
            return Err(JournalError::Forbidden(
                "files can only be deleted by authors of a draft or by admins".to_string(),
            ));
        }

        self.in_transaction(|w| {
            w.store.delete_file(&file.id)?;
            w.record(
                Event::new(
                    file.id,
                    EntityType::File,
                    EventPayload::FileDeleted {
                        article_id: file.article_id.to_string(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(file_id = %file.id, article_id = %file.article_id, "file deleted");
        Ok(file)
    }

    /// Flip a file's active flag. Only the assigned editor, a chief editor
    /// or an admin may do this, and not once the article is rejected or
    /// published. Activating a manuscript deactivates the rest of its round
    /// first.
    pub fn set_file_active(&mut self, actor: &Actor, file_id: &FileId, active: bool) -> Result<ArticleFile> {
        if !actor.role.is_editorial() {
            return Err(JournalError::Forbidden(
                "only editors may change file activation".to_string(),
            ));
        }
        let mut file = self.load_file(file_id)?;
        let article = self.load_article(&file.article_id)?;
        require(access_for(actor, &article), Access::MANAGE, "change file activation on this article")?;
        if article.status.is_terminal() {
            return Err(ArticleError::Locked {
                id: article.id,
                status: article.status,
            }
            .into());
        }
        if file.is_active == active {
            return Ok(file);
        }

        file.is_active = active;
        self.in_transaction(|w| {
            if active && file.category == FileCategory::Manuscript {
                w.store
                    .deactivate_files(&file.article_id, FileCategory::Manuscript, file.round)?;
            }
            w.store.update_file(&file)?;
            w.record(
                Event::new(
                    file.id,
                    EntityType::File,
                    EventPayload::FileActivationChanged { is_active: active },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(file_id = %file.id, active, "file activation changed");
        Ok(file)
    }
}
