//! Review invitation integration tests

mod common;

use chrono::{Duration, Utc};

use common::fixtures::{draft_with_manuscript, drive, workflow, Cast, TO_UNDER_REVIEW};
use journal_core::error::ReviewError;
use journal_core::{
    EntityType, ErrorKind, EventPayload, InvitationRequest, JournalError, Recommendation,
    ReviewStatus, ReviewSubmission, UserId,
};

#[test]
fn test_second_invitation_fails_and_first_is_untouched() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Invite once");
    drive(&mut w, &cast, id, TO_UNDER_REVIEW);

    let first = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap();
    let err = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateInvitation);
    assert_eq!(w.review(&cast.chief, &first.id).unwrap(), first);
    assert_eq!(w.reviews_for_article(&cast.chief, &id).unwrap().len(), 1);
}

#[test]
fn test_declined_reviewer_cannot_be_reinvited() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Declined once");
    drive(&mut w, &cast, id, TO_UNDER_REVIEW);

    let review = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap();
    w.decline_invitation(&cast.reviewer, &review.id, Some("Too busy"))
        .unwrap();

    // Uniqueness holds across rounds and statuses
    w.start_new_round(&cast.chief, &id).unwrap();
    let err = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateInvitation);
}

#[test]
fn test_batch_is_all_or_nothing() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Batch");
    drive(&mut w, &cast, id, TO_UNDER_REVIEW);

    let existing = UserId::new();
    w.create_invitation(&cast.chief, &id, InvitationRequest::new(existing))
        .unwrap();

    let fresh = UserId::new();
    let err = w
        .create_invitations(
            &cast.chief,
            &id,
            vec![InvitationRequest::new(fresh), InvitationRequest::new(existing)],
        )
        .unwrap_err();
    match &err {
        JournalError::Review(ReviewError::InvitationsRejected { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].reviewer_id, existing);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.details().is_some());
    assert!(w.reviews_for_reviewer(&cast.admin, &fresh).unwrap().is_empty());

    let created = w
        .create_invitations(
            &cast.chief,
            &id,
            vec![InvitationRequest::new(fresh), InvitationRequest::new(UserId::new())],
        )
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(w.reviews_for_article(&cast.chief, &id).unwrap().len(), 3);
}

#[test]
fn test_batch_lists_every_kind_of_failure() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Mixed batch");
    drive(&mut w, &cast, id, TO_UNDER_REVIEW);

    let existing = UserId::new();
    w.create_invitation(&cast.chief, &id, InvitationRequest::new(existing))
        .unwrap();

    let now = Utc::now();
    let late = UserId::new();
    let fresh = UserId::new();
    let err = w
        .create_invitations(
            &cast.chief,
            &id,
            vec![
                InvitationRequest::new(cast.author.id),
                InvitationRequest {
                    reviewer_id: late,
                    response_deadline: Some(now + Duration::days(20)),
                    review_deadline: Some(now + Duration::days(5)),
                },
                InvitationRequest::new(fresh),
                InvitationRequest::new(existing),
            ],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateInvitation);

    let details = err.details().unwrap();
    let reported: Vec<(String, String)> = details
        .as_array()
        .unwrap()
        .iter()
        .map(|d| {
            (
                d["reviewer_id"].as_str().unwrap().to_string(),
                d["kind"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        reported,
        vec![
            (cast.author.id.to_string(), "VALIDATION".to_string()),
            (late.to_string(), "VALIDATION".to_string()),
            (existing.to_string(), "DUPLICATE_INVITATION".to_string()),
        ]
    );

    // The valid reviewer in the batch was not invited either
    assert!(w.reviews_for_reviewer(&cast.admin, &fresh).unwrap().is_empty());
    assert_eq!(w.reviews_for_article(&cast.chief, &id).unwrap().len(), 1);
}

#[test]
fn test_batch_without_duplicates_is_validation() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Invalid batch");
    let err = w
        .create_invitations(
            &cast.chief,
            &id,
            vec![
                InvitationRequest::new(cast.author.id),
                InvitationRequest::new(UserId::new()),
            ],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.details().unwrap().as_array().unwrap().len(), 1);
}

#[test]
fn test_author_cannot_review_own_article() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Self review");
    let err = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.author.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_only_managers_invite() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Who invites");
    let err = w
        .create_invitation(&cast.author, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn test_terminal_article_refuses_invitations() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Rejected early");
    drive(
        &mut w,
        &cast,
        id,
        &[journal_core::ArticleStatus::Submitted, journal_core::ArticleStatus::Rejected],
    );
    let err = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArticleLocked);
}

#[test]
fn test_full_review_cycle_records_events() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Reviewed");
    drive(&mut w, &cast, id, TO_UNDER_REVIEW);

    let review = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap();
    w.send_reminder(&cast.chief, &review.id).unwrap();
    w.accept_invitation(&cast.reviewer, &review.id).unwrap();
    w.send_reminder(&cast.chief, &review.id).unwrap();

    // Completing without a recommendation changes nothing
    let err = w
        .complete_review(&cast.reviewer, &review.id, ReviewSubmission::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRecommendation);
    assert_eq!(
        w.review(&cast.reviewer, &review.id).unwrap().status,
        ReviewStatus::Accepted
    );

    let done = w
        .complete_review(
            &cast.reviewer,
            &review.id,
            ReviewSubmission {
                recommendation: Some(Recommendation::MajorRevision),
                comments_for_author: Some("The method section needs work.".into()),
                comments_for_editor: Some("Promising.".into()),
            },
        )
        .unwrap();
    assert_eq!(done.status, ReviewStatus::Completed);
    assert_eq!(done.reminder_count, 2);
    assert!(done.submitted_date.is_some());

    let events = w
        .events_for(&review.id.to_string(), EntityType::Review)
        .unwrap();
    let kinds: Vec<_> = events
        .iter()
        .map(|e| match &e.payload {
            EventPayload::InvitationCreated { .. } => "created",
            EventPayload::ReminderSent { .. } => "reminder",
            EventPayload::InvitationAccepted => "accepted",
            EventPayload::ReviewCompleted { .. } => "completed",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "reminder", "accepted", "reminder", "completed"]);
    assert!(events.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
}

#[test]
fn test_decline_needs_reason() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Declining");
    let review = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap();
    assert_eq!(
        w.decline_invitation(&cast.reviewer, &review.id, None)
            .unwrap_err()
            .kind(),
        ErrorKind::MissingReason
    );
    let declined = w
        .decline_invitation(&cast.reviewer, &review.id, Some("Conflict of interest"))
        .unwrap();
    assert_eq!(declined.status, ReviewStatus::Declined);
    assert_eq!(
        w.accept_invitation(&cast.reviewer, &review.id)
            .unwrap_err()
            .kind(),
        ErrorKind::AlreadyResponded
    );
}

#[test]
fn test_reviewer_sees_only_own_invitations() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Privacy");
    let review = w
        .create_invitation(&cast.chief, &id, InvitationRequest::new(cast.reviewer.id))
        .unwrap();

    let mine = w.reviews_for_reviewer(&cast.reviewer, &cast.reviewer.id).unwrap();
    assert_eq!(mine.len(), 1);

    let other = journal_core::Actor::with_role(journal_core::Role::Reviewer);
    assert_eq!(
        w.reviews_for_reviewer(&other, &cast.reviewer.id)
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        w.review(&other, &review.id).unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        w.reviews_for_article(&cast.reviewer, &id).unwrap_err().kind(),
        ErrorKind::Forbidden
    );
}
