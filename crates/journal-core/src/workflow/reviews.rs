//! Review invitation operations

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Workflow;
use crate::actor::{access_for, require, Access, Actor, UserId};
use crate::article::{Article, ArticleId};
use crate::error::{ArticleError, JournalError, Result, ReviewError};
use crate::event::{EntityType, Event, EventPayload};
use crate::persistence::Store;
use crate::review::{InvitationFailure, InvitationRequest, Review, ReviewId, ReviewSubmission};

impl<S: Store> Workflow<S> {
    /// Invite one reviewer. The invitation is stamped with the article's
    /// current round.
    pub fn create_invitation(
        &mut self,
        actor: &Actor,
        article_id: &ArticleId,
        request: InvitationRequest,
    ) -> Result<Review> {
        let article = self.invitable_article(actor, article_id)?;
        let review = self.build_invitation(actor, &article, &request, Utc::now())?;

        if self
            .store
            .find_review(&article.id, &request.reviewer_id)?
            .is_some()
        {
            return Err(ReviewError::DuplicateInvitation {
                article_id: article.id,
                reviewer_id: request.reviewer_id,
            }
            .into());
        }

        self.in_transaction(|w| w.insert_invitation(actor, &review, None))?;
        Ok(review)
    }

    /// Invite several reviewers at once.
    ///
    /// Every reviewer is checked before anything is written. If any of them
    /// is already invited, listed twice, or otherwise invalid, nothing is
    /// created and the error lists every failure.
    pub fn create_invitations(
        &mut self,
        actor: &Actor,
        article_id: &ArticleId,
        requests: Vec<InvitationRequest>,
    ) -> Result<Vec<Review>> {
        if requests.is_empty() {
            return Err(JournalError::Validation(
                "at least one reviewer is required".to_string(),
            ));
        }
        let article = self.invitable_article(actor, article_id)?;
        let now = Utc::now();

        let mut seen = HashSet::new();
        let mut failures: Vec<InvitationFailure> = Vec::new();
        let mut reviews = Vec::with_capacity(requests.len());
        for request in &requests {
            let reviewer = request.reviewer_id;
            let already_invited = !seen.insert(reviewer)
                || self.store.find_review(&article.id, &reviewer)?.is_some();
            if already_invited {
                let reported = failures
                    .iter()
                    .any(|f| f.reviewer_id == reviewer && f.is_duplicate());
                if !reported {
                    let err: JournalError = ReviewError::DuplicateInvitation {
                        article_id: article.id,
                        reviewer_id: reviewer,
                    }
                    .into();
                    failures.push(InvitationFailure::new(reviewer, &err));
                }
                continue;
            }
            match self.build_invitation(actor, &article, request, now) {
                Ok(review) => reviews.push(review),
                Err(err) => failures.push(InvitationFailure::new(reviewer, &err)),
            }
        }

        if !failures.is_empty() {
            tracing::debug!(article_id = %article.id, count = failures.len(), "batch invitation rejected");
            return Err(ReviewError::InvitationsRejected {
                article_id: article.id,
                failures,
            }
            .into());
        }

        let correlation = Uuid::new_v4().to_string();
        self.in_transaction(|w| {
            for review in &reviews {
                w.insert_invitation(actor, review, Some(&correlation))?;
            }
            Ok(())
        })?;
        Ok(reviews)
    }

    /// Reviewer accepts
    pub fn accept_invitation(&mut self, actor: &Actor, review_id: &ReviewId) -> Result<Review> {
        self.respond(actor, review_id, |review, now| {
            review.accept(now)?;
            Ok(EventPayload::InvitationAccepted)
        })
    }

    /// Reviewer declines, giving a reason
    pub fn decline_invitation(
        &mut self,
        actor: &Actor,
        review_id: &ReviewId,
        reason: Option<&str>,
    ) -> Result<Review> {
        self.respond(actor, review_id, |review, now| {
            review.decline(reason, now)?;
            Ok(EventPayload::InvitationDeclined {
                reason: review.decline_reason.clone().unwrap_or_default(),
            })
        })
    }

    /// Reviewer submits the review
    pub fn complete_review(
        &mut self,
        actor: &Actor,
        review_id: &ReviewId,
        submission: ReviewSubmission,
    ) -> Result<Review> {
        self.respond(actor, review_id, |review, now| {
            review.complete(submission, now)?;
            let recommendation = review
                .recommendation
                .ok_or(ReviewError::MissingRecommendation)?;
            Ok(EventPayload::ReviewCompleted { recommendation })
        })
    }

    /// Record a reminder sent to the reviewer
    pub fn send_reminder(&mut self, actor: &Actor, review_id: &ReviewId) -> Result<Review> {
        self.manage_review(actor, review_id, |review, now| {
            review.remind(now)?;
            Ok(EventPayload::ReminderSent {
                reminder_count: review.reminder_count,
            })
        })
    }

    /// Time out an open invitation; driven by an external sweep
    pub fn expire_invitation(&mut self, actor: &Actor, review_id: &ReviewId) -> Result<Review> {
        self.manage_review(actor, review_id, |review, _| {
            review.expire()?;
            Ok(EventPayload::InvitationExpired)
        })
    }

    /// Read one invitation: the reviewer, or anyone managing the article
    pub fn review(&self, actor: &Actor, review_id: &ReviewId) -> Result<Review> {
        let review = self.load_review(review_id)?;
        if review.reviewer_id != actor.id {
            let article = self.load_article(&review.article_id)?;
            require(access_for(actor, &article), Access::MANAGE, "view this review")?;
        }
        Ok(review)
    }

    /// Every invitation for an article
    pub fn reviews_for_article(&self, actor: &Actor, article_id: &ArticleId) -> Result<Vec<Review>> {
        let article = self.load_article(article_id)?;
        require(access_for(actor, &article), Access::MANAGE, "view reviews of this article")?;
        self.store.reviews_for_article(article_id)
    }

    /// Every invitation sent to a reviewer: the reviewer or editorial staff
    pub fn reviews_for_reviewer(&self, actor: &Actor, reviewer_id: &UserId) -> Result<Vec<Review>> {
        if actor.id != *reviewer_id && !actor.role.is_editorial() {
            return Err(JournalError::Forbidden(
                "not allowed to view another reviewer's invitations".to_string(),
            ));
        }
        self.store.reviews_for_reviewer(reviewer_id)
    }

    fn invitable_article(&self, actor: &Actor, article_id: &ArticleId) -> Result<Article> {
        let article = self.load_article(article_id)?;
        require(access_for(actor, &article), Access::MANAGE, "invite reviewers for this article")?;
        if article.status.is_terminal() {
            return Err(ArticleError::Locked {
                id: article.id,
                status: article.status,
            }
            .into());
        }
        Ok(article)
    }

    fn build_invitation(
        &self,
        actor: &Actor,
        article: &Article,
        request: &InvitationRequest,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        if article.is_author(&request.reviewer_id) {
            return Err(JournalError::Validation(format!(
                "reviewer {} is an author of article {}",
                request.reviewer_id, article.id
            )));
        }
        let (response_deadline, review_deadline) = request.deadlines(&self.config.review, now)?;
        Ok(Review::new(
            article.id,
            request.reviewer_id,
            article.current_round,
            actor.id,
            response_deadline,
            review_deadline,
        ))
    }

    fn insert_invitation(
        &mut self,
        actor: &Actor,
        review: &Review,
        correlation_id: Option<&str>,
    ) -> Result<()> {
        self.store.insert_review(review)?;
        let mut event = Event::new(
            review.id,
            EntityType::Review,
            EventPayload::InvitationCreated {
                article_id: review.article_id.to_string(),
                reviewer_id: review.reviewer_id,
                round: review.round,
            },
        )
        .with_actor(actor.id);
        if let Some(correlation_id) = correlation_id {
            event = event.with_correlation(correlation_id);
        }
        self.record(event)?;
        tracing::info!(
            review_id = %review.id,
            article_id = %review.article_id,
            reviewer_id = %review.reviewer_id,
            round = review.round,
            "reviewer invited"
        );
        Ok(())
    }

    /// Reviewer-only change: checks run as existence, identity, then the
    /// state rules inside `apply`
    fn respond(
        &mut self,
        actor: &Actor,
        review_id: &ReviewId,
        apply: impl FnOnce(&mut Review, DateTime<Utc>) -> Result<EventPayload>,
    ) -> Result<Review> {
        let review = self.load_review(review_id)?;
        if review.reviewer_id != actor.id {
            return Err(JournalError::Forbidden(
                "only the invited reviewer may respond to this invitation".to_string(),
            ));
        }
        self.save_review(actor, review, apply)
    }

    /// Editor-side change on an invitation
    fn manage_review(
        &mut self,
        actor: &Actor,
        review_id: &ReviewId,
        apply: impl FnOnce(&mut Review, DateTime<Utc>) -> Result<EventPayload>,
    ) -> Result<Review> {
        let review = self.load_review(review_id)?;
        let article = self.load_article(&review.article_id)?;
        require(access_for(actor, &article), Access::MANAGE, "manage this review")?;
        self.save_review(actor, review, apply)
    }

    fn save_review(
        &mut self,
        actor: &Actor,
        mut review: Review,
        apply: impl FnOnce(&mut Review, DateTime<Utc>) -> Result<EventPayload>,
    ) -> Result<Review> {
        let read_version = review.version;
        let payload = apply(&mut review, Utc::now())?;
        let description = payload.description();

        self.in_transaction(|w| {
            w.store.update_review(&review, read_version)?;
            w.record(Event::new(review.id, EntityType::Review, payload).with_actor(actor.id))?;
            Ok(())
        })?;

        tracing::info!(review_id = %review.id, status = %review.status, "{}", description);
        Ok(review)
    }
}
