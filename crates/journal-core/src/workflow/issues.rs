//! Issue assembly and the publication gate

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use super::{check_expected_version, Workflow};
use crate::actor::Actor;
use crate::article::{Article, ArticleId, ArticleStatus};
use crate::error::{IssueError, JournalError, Result};
use crate::event::{EntityType, Event, EventPayload};
use crate::issue::{Issue, IssueId, IssueUpdate, NewIssue, PublishRequest, UnreadyArticle};
use crate::persistence::Store;

impl<S: Store> Workflow<S> {
    /// Create an empty issue (admin or chief editor)
    pub fn create_issue(&mut self, actor: &Actor, new: NewIssue) -> Result<Issue> {
        require_administrative(actor, "create issues")?;
        let issue = Issue::new(new)?;

        self.in_transaction(|w| {
            w.store.insert_issue(&issue)?;
            w.record(
                Event::new(
                    issue.id,
                    EntityType::Issue,
                    EventPayload::IssueCreated {
                        title: issue.title.clone(),
                        volume_number: issue.volume_number,
                        issue_number: issue.issue_number,
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(issue_id = %issue.id, title = %issue.title, "issue created");
        Ok(issue)
    }

    /// Read an issue
    pub fn issue(&self, issue_id: &IssueId) -> Result<Issue> {
        self.load_issue(issue_id)
    }

    /// Correct the title, date or numbering of an unpublished issue.
    /// Renumbering onto an existing (volume, issue) pair is a conflict.
    pub fn update_issue(
        &mut self,
        actor: &Actor,
        issue_id: &IssueId,
        update: IssueUpdate,
        expected_version: Option<u64>,
    ) -> Result<Issue> {
        require_administrative(actor, "edit issues")?;
        let mut issue = self.load_issue(issue_id)?;
        check_expected_version(format!("issue {}", issue.id), expected_version, issue.version)?;
        let read_version = issue.version;
        issue.apply_update(update)?;

        self.in_transaction(|w| {
            w.store.update_issue(&issue, read_version)?;
            w.record(
                Event::new(
                    issue.id,
                    EntityType::Issue,
                    EventPayload::IssueUpdated {
                        title: issue.title.clone(),
                        volume_number: issue.volume_number,
                        issue_number: issue.issue_number,
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(issue_id = %issue.id, title = %issue.title, "issue updated");
        Ok(issue)
    }

    /// Put an article in an unpublished issue
    pub fn add_article_to_issue(
        &mut self,
        actor: &Actor,
        issue_id: &IssueId,
        article_id: &ArticleId,
    ) -> Result<Issue> {
        require_administrative(actor, "change issue contents")?;
        let mut issue = self.load_issue(issue_id)?;
        issue.ensure_unlocked()?;
        let mut article = self.load_article(article_id)?;

        match article.issue_id {
            Some(current) if current == issue.id => return Ok(issue),
            Some(current) => {
                return Err(JournalError::Conflict(format!(
                    "article {} already belongs to issue {}",
                    article.id, current
                )))
            }
            None => {}
        }

        let issue_version = issue.version;
        let article_version = article.version;
        issue.add_article(article.id)?;
        article.issue_id = Some(issue.id);
        article.touch(Utc::now());

        self.in_transaction(|w| {
            w.store.update_issue(&issue, issue_version)?;
            w.store.update_article(&article, article_version)?;
            w.record(
                Event::new(
                    issue.id,
                    EntityType::Issue,
                    EventPayload::IssueArticleAdded {
                        article_id: article.id.to_string(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(issue_id = %issue.id, article_id = %article.id, "article added to issue");
        Ok(issue)
    }

    /// Take an article out of an unpublished issue
    pub fn remove_article_from_issue(
        &mut self,
        actor: &Actor,
        issue_id: &IssueId,
        article_id: &ArticleId,
    ) -> Result<Issue> {
        require_administrative(actor, "change issue contents")?;
        let mut issue = self.load_issue(issue_id)?;
        let issue_version = issue.version;
        if !issue.remove_article(article_id)? {
            return Err(JournalError::NotFound(format!(
                "article {} in issue {}",
                article_id, issue.id
            )));
        }

        self.in_transaction(|w| {
            w.store.update_issue(&issue, issue_version)?;
            if let Some(mut article) = w.store.get_article(article_id)? {
                if article.issue_id == Some(issue.id) {
                    let read_version = article.version;
                    article.issue_id = None;
                    article.touch(Utc::now());
                    w.store.update_article(&article, read_version)?;
                }
            }
            w.record(
                Event::new(
                    issue.id,
                    EntityType::Issue,
                    EventPayload::IssueArticleRemoved {
                        article_id: article_id.to_string(),
                    },
                )
                .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(issue_id = %issue.id, %article_id, "article removed from issue");
        Ok(issue)
    }

    /// Delete an unpublished issue, releasing its articles
    pub fn delete_issue(&mut self, actor: &Actor, issue_id: &IssueId) -> Result<Issue> {
        require_administrative(actor, "delete issues")?;
        let issue = self.load_issue(issue_id)?;
        if issue.is_published {
            return Err(IssueError::AlreadyPublished(issue.id).into());
        }

        self.in_transaction(|w| {
            for article_id in &issue.article_ids {
                let Some(mut article) = w.store.get_article(article_id)? else {
                    continue;
                };
                if article.issue_id == Some(issue.id) {
                    let read_version = article.version;
                    article.issue_id = None;
                    article.touch(Utc::now());
                    w.store.update_article(&article, read_version)?;
                }
            }
            if !w.store.delete_issue(&issue.id)? {
                return Err(JournalError::NotFound(format!("issue {}", issue.id)));
            }
            w.record(
                Event::new(issue.id, EntityType::Issue, EventPayload::IssueDeleted)
                    .with_actor(actor.id),
            )?;
            Ok(())
        })?;

        tracing::info!(issue_id = %issue.id, "issue deleted");
        Ok(issue)
    }

    /// Publish an issue.
    ///
    /// Every member must be accepted or already published, and every DOI in
    /// the request must be free, before anything is written. Accepted
    /// members then move to published through the normal transition path;
    /// members already published only get their issue and DOI set. The
    /// whole cascade shares the issue id as correlation id and commits or
    /// rolls back as one.
    pub fn publish_issue(&mut self, actor: &Actor, request: PublishRequest) -> Result<Issue> {
        require_administrative(actor, "publish issues")?;
        let mut issue = self.load_issue(&request.issue_id)?;
        if issue.is_published {
            return Err(IssueError::AlreadyPublished(issue.id).into());
        }
        if issue.article_ids.is_empty() {
            return Err(IssueError::EmptyIssue(issue.id).into());
        }

        let mut members = Vec::with_capacity(issue.article_ids.len());
        let mut unready = Vec::new();
        for article_id in &issue.article_ids {
            let article = self.load_article(article_id)?;
            if !article.status.is_publishable() {
                unready.push(UnreadyArticle {
                    id: article.id,
                    title: article.title.clone(),
                    status: article.status,
                });
            }
            members.push(article);
        }
        if !unready.is_empty() {
            tracing::debug!(issue_id = %issue.id, count = unready.len(), "issue not ready to publish");
            return Err(IssueError::ArticlesNotReady {
                issue_id: issue.id,
                articles: unready,
            }
            .into());
        }

        let dois = self.check_dois(&issue, &members, &request)?;

        let correlation = issue.id.to_string();
        let issue_version = issue.version;
        let now = Utc::now();
        issue.mark_published(now);

        self.in_transaction(|w| {
            for mut article in members {
                let doi = dois.get(&article.id).cloned();
                let read_version = article.version;
                article.issue_id = Some(issue.id);
                if let Some(doi) = &doi {
                    article.doi = Some(doi.clone());
                }

                if article.status == ArticleStatus::Accepted {
                    article = w.apply_transition(
                        article,
                        actor.id,
                        ArticleStatus::Published,
                        Some(format!("Published in {}", issue.title)),
                        Some(correlation.clone()),
                    )?;
                } else {
                    article.touch(now);
                    w.store.update_article(&article, read_version)?;
                }

                if let Some(doi) = doi {
                    w.record(
                        Event::new(article.id, EntityType::Article, EventPayload::DoiAssigned { doi })
                            .with_actor(actor.id)
                            .with_correlation(&correlation),
                    )?;
                }
            }

            w.store.update_issue(&issue, issue_version)?;
            w.record(
                Event::new(
                    issue.id,
                    EntityType::Issue,
                    EventPayload::IssuePublished {
                        article_count: issue.article_ids.len(),
                    },
                )
                .with_actor(actor.id)
                .with_correlation(&correlation),
            )?;
            Ok(())
        })?;

        tracing::info!(
            issue_id = %issue.id,
            articles = issue.article_ids.len(),
            "issue published"
        );
        Ok(issue)
    }

    /// Validate the DOI assignments of a publish request against the
    /// members, each other and the store
    fn check_dois(
        &self,
        issue: &Issue,
        members: &[Article],
        request: &PublishRequest,
    ) -> Result<HashMap<ArticleId, String>> {
        let mut assigned = HashMap::new();
        let mut seen = HashSet::new();
        let mut clashes = Vec::new();

        for assignment in &request.dois {
            let doi = assignment.doi.trim();
            if doi.is_empty() {
                return Err(JournalError::Validation("DOI must not be empty".to_string()));
            }
            if !issue.contains(&assignment.article_id) {
                return Err(JournalError::Validation(format!(
                    "article {} is not in issue {}",
                    assignment.article_id, issue.id
                )));
            }
            if assigned.insert(assignment.article_id, doi.to_string()).is_some() {
                return Err(JournalError::Validation(format!(
                    "more than one DOI given for article {}",
                    assignment.article_id
                )));
            }

            let taken_elsewhere = match self.store.find_article_by_doi(doi)? {
                Some(holder) => holder.id != assignment.article_id,
                None => false,
            };
            if (!seen.insert(doi.to_string()) || taken_elsewhere) && !clashes.iter().any(|c| c == doi) {
                clashes.push(doi.to_string());
            }
        }

        // A member keeping its current DOI is not a clash, but replacing
        // one that was already assigned is not allowed here either.
        for article in members {
            if let (Some(current), Some(new)) = (&article.doi, assigned.get(&article.id)) {
                if current != new {
                    return Err(JournalError::Validation(format!(
                        "article {} already has DOI {}",
                        article.id, current
                    )));
                }
            }
        }

        if !clashes.is_empty() {
            return Err(IssueError::DuplicateDois(clashes).into());
        }
        Ok(assigned)
    }
}

fn require_administrative(actor: &Actor, action: &str) -> Result<()> {
    if actor.role.is_administrative() {
        Ok(())
    } else {
        Err(JournalError::Forbidden(format!(
            "only admins and chief editors may {}",
            action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::article::NewArticle;
    use crate::error::ErrorKind;
    use crate::file::{FileCategory, FileMetadata, FileUpload};
    use crate::issue::DoiAssignment;
    use crate::persistence::InMemoryStore;
    use crate::workflow::TransitionRequest;

    struct Fixture {
        w: Workflow<InMemoryStore>,
        author: Actor,
        chief: Actor,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                w: Workflow::with_store(InMemoryStore::new()),
                author: Actor::with_role(Role::Author),
                chief: Actor::with_role(Role::ChiefEditor),
            }
        }

        fn article(&mut self, title: &str) -> ArticleId {
            let article = self
                .w
                .create_article(
                    &self.author,
                    NewArticle {
                        title: title.into(),
                        abstract_text: "Abstract.".into(),
                        keywords: vec!["a".into(), "b".into(), "c".into()],
                        language: "en".into(),
                        ..Default::default()
                    },
                )
                .unwrap();
            article.id
        }

        /// Drive an article through submission to `target`
        fn advance(&mut self, id: ArticleId, path: &[ArticleStatus]) {
            self.w
                .register_upload(
                    &self.author,
                    FileUpload {
                        article_id: id,
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
            for status in path {
                self.w
                    .request_transition(&self.chief, TransitionRequest::new(id, *status))
                    .unwrap();
            }
        }

        fn issue(&mut self) -> IssueId {
            self.w
                .create_issue(
                    &self.chief,
                    NewIssue {
                        volume_number: 1,
                        issue_number: 1,
                        ..Default::default()
                    },
                )
                .unwrap()
                .id
        }
    }

    const TO_ACCEPTED: &[ArticleStatus] = &[
        ArticleStatus::Submitted,
        ArticleStatus::UnderReview,
        ArticleStatus::Accepted,
    ];

    #[test]
    fn test_duplicate_issue_numbers() {
        let mut f = Fixture::new();
        f.issue();
        let err = f
            .w
            .create_issue(
                &f.chief,
                NewIssue {
                    volume_number: 1,
                    issue_number: 1,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_author_cannot_create_issue() {
        let mut f = Fixture::new();
        let err = f.w.create_issue(&f.author, NewIssue::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_publish_cascades() {
        let mut f = Fixture::new();
        let accepted = f.article("Accepted work");
        f.advance(accepted, TO_ACCEPTED);
        let issue_id = f.issue();
        f.w.add_article_to_issue(&f.chief, &issue_id, &accepted)
            .unwrap();

        let mut request = PublishRequest::new(issue_id);
        request.dois.push(DoiAssignment {
            article_id: accepted,
            doi: "10.5555/j.2026.1".into(),
        });
        let issue = f.w.publish_issue(&f.chief, request).unwrap();
        assert!(issue.is_published);

        let article = f.w.article(&f.chief, &accepted).unwrap();
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(article.issue_id, Some(issue_id));
        assert_eq!(article.doi.as_deref(), Some("10.5555/j.2026.1"));
        assert!(article.milestones.published_date.is_some());

        let events = f.w.events_after(0).unwrap();
        let correlated = events
            .iter()
            .filter(|e| e.correlation_id.as_deref() == Some(issue_id.to_string().as_str()))
            .count();
        // status change, DOI, issue published
        assert_eq!(correlated, 3);
    }

    #[test]
    fn test_unready_members_block_publication() {
        let mut f = Fixture::new();
        let accepted = f.article("Ready");
        f.advance(accepted, TO_ACCEPTED);
        let reviewing = f.article("Not ready");
        f.advance(reviewing, &[ArticleStatus::Submitted, ArticleStatus::UnderReview]);

        let issue_id = f.issue();
        f.w.add_article_to_issue(&f.chief, &issue_id, &accepted)
            .unwrap();
        f.w.add_article_to_issue(&f.chief, &issue_id, &reviewing)
            .unwrap();

        let err = f
            .w
            .publish_issue(&f.chief, PublishRequest::new(issue_id))
            .unwrap_err();
        match &err {
            JournalError::Issue(IssueError::ArticlesNotReady { articles, .. }) => {
                assert_eq!(articles.len(), 1);
                assert_eq!(articles[0].id, reviewing);
                assert_eq!(articles[0].status, ArticleStatus::UnderReview);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!f.w.issue(&issue_id).unwrap().is_published);
        assert_eq!(
            f.w.article(&f.chief, &accepted).unwrap().status,
            ArticleStatus::Accepted
        );
    }

    #[test]
    fn test_empty_and_republish() {
        let mut f = Fixture::new();
        let issue_id = f.issue();
        assert_eq!(
            f.w.publish_issue(&f.chief, PublishRequest::new(issue_id))
                .unwrap_err()
                .kind(),
            ErrorKind::EmptyIssue
        );

        let accepted = f.article("Only one");
        f.advance(accepted, TO_ACCEPTED);
        f.w.add_article_to_issue(&f.chief, &issue_id, &accepted)
            .unwrap();
        f.w.publish_issue(&f.chief, PublishRequest::new(issue_id))
            .unwrap();
        assert_eq!(
            f.w.publish_issue(&f.chief, PublishRequest::new(issue_id))
                .unwrap_err()
                .kind(),
            ErrorKind::AlreadyPublished
        );
        assert_eq!(
            f.w.remove_article_from_issue(&f.chief, &issue_id, &accepted)
                .unwrap_err()
                .kind(),
            ErrorKind::IssueLocked
        );
        assert_eq!(
            f.w.delete_issue(&f.chief, &issue_id).unwrap_err().kind(),
            ErrorKind::AlreadyPublished
        );
    }

    #[test]
    fn test_article_in_one_issue_only() {
        let mut f = Fixture::new();
        let article = f.article("Single home");
        let first = f.issue();
        let second = f
            .w
            .create_issue(
                &f.chief,
                NewIssue {
                    volume_number: 1,
                    issue_number: 2,
                    ..Default::default()
                },
            )
            .unwrap()
            .id;
        f.w.add_article_to_issue(&f.chief, &first, &article).unwrap();
        assert_eq!(
            f.w.add_article_to_issue(&f.chief, &second, &article)
                .unwrap_err()
                .kind(),
            ErrorKind::Conflict
        );

        f.w.remove_article_from_issue(&f.chief, &first, &article)
            .unwrap();
        assert_eq!(f.w.article(&f.chief, &article).unwrap().issue_id, None);
        f.w.add_article_to_issue(&f.chief, &second, &article)
            .unwrap();
    }

    #[test]
    fn test_delete_issue_releases_articles() {
        let mut f = Fixture::new();
        let article = f.article("Released");
        let issue_id = f.issue();
        f.w.add_article_to_issue(&f.chief, &issue_id, &article)
            .unwrap();
        f.w.delete_issue(&f.chief, &issue_id).unwrap();
        assert_eq!(f.w.issue(&issue_id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(f.w.article(&f.chief, &article).unwrap().issue_id, None);
    }

    #[test]
    fn test_clashing_dois_write_nothing() {
        let mut f = Fixture::new();
        let holder = f.article("Holds the DOI");
        f.w.assign_doi(&f.chief, &holder, "10.5555/taken").unwrap();
        let (a, b) = (f.article("A"), f.article("B"));
        f.advance(a, TO_ACCEPTED);
        f.advance(b, TO_ACCEPTED);
        let issue_id = f.issue();
        f.w.add_article_to_issue(&f.chief, &issue_id, &a).unwrap();
        f.w.add_article_to_issue(&f.chief, &issue_id, &b).unwrap();

        let mut request = PublishRequest::new(issue_id);
        request.dois = vec![
            DoiAssignment {
                article_id: a,
                doi: "10.5555/taken".into(),
            },
            DoiAssignment {
                article_id: b,
                doi: "10.5555/fresh".into(),
            },
        ];
        let err = f.w.publish_issue(&f.chief, request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDoi);
        assert_eq!(f.w.article(&f.chief, &b).unwrap().status, ArticleStatus::Accepted);
        assert_eq!(f.w.article(&f.chief, &b).unwrap().doi, None);
    }

    #[test]
    fn test_already_published_member_keeps_history() {
        let mut f = Fixture::new();
        let article = f.article("Published early");
        let mut path = TO_ACCEPTED.to_vec();
        path.push(ArticleStatus::Published);
        f.advance(article, &path);
        let before = f.w.article(&f.chief, &article).unwrap();

        let issue_id = f.issue();
        f.w.add_article_to_issue(&f.chief, &issue_id, &article)
            .unwrap();
        f.w.publish_issue(&f.chief, PublishRequest::new(issue_id))
            .unwrap();

        let after = f.w.article(&f.chief, &article).unwrap();
        assert_eq!(after.status_history, before.status_history);
        assert_eq!(after.milestones.published_date, before.milestones.published_date);
        assert_eq!(after.issue_id, Some(issue_id));
    }
}
