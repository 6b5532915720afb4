//! Issue publication integration tests

mod common;

use common::fixtures::{draft_with_manuscript, drive, workflow, Cast, TO_ACCEPTED, TO_UNDER_REVIEW};
use journal_core::error::IssueError;
use journal_core::{
    ArticleStatus, DoiAssignment, EntityType, ErrorKind, EventPayload, IssueUpdate, JournalError,
    NewIssue, PublishRequest,
};

fn first_issue() -> NewIssue {
    NewIssue {
        volume_number: 12,
        issue_number: 1,
        ..Default::default()
    }
}

#[test]
fn test_unready_member_blocks_publication() {
    let cast = Cast::new();
    let mut w = workflow();
    let ready = draft_with_manuscript(&mut w, &cast, "Ready");
    drive(&mut w, &cast, ready, TO_ACCEPTED);
    let pending = draft_with_manuscript(&mut w, &cast, "Pending");
    drive(&mut w, &cast, pending, TO_UNDER_REVIEW);

    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    w.add_article_to_issue(&cast.chief, &issue.id, &ready).unwrap();
    w.add_article_to_issue(&cast.chief, &issue.id, &pending).unwrap();

    let err = w
        .publish_issue(&cast.chief, PublishRequest::new(issue.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArticlesNotReady);
    match err {
        JournalError::Issue(IssueError::ArticlesNotReady { articles, .. }) => {
            let ids: Vec<_> = articles.iter().map(|a| a.id).collect();
            assert_eq!(ids, vec![pending]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!w.issue(&issue.id).unwrap().is_published);
    assert_eq!(w.article(&cast.chief, &ready).unwrap().status, ArticleStatus::Accepted);
    assert_eq!(
        w.article(&cast.chief, &pending).unwrap().status,
        ArticleStatus::UnderReview
    );
}

#[test]
fn test_publication_cascades_to_every_member() {
    let cast = Cast::new();
    let mut w = workflow();
    let issue = w.create_issue(&cast.admin, first_issue()).unwrap();
    assert_eq!(issue.title, "Vol.12 No.1");

    let mut members = Vec::new();
    for title in ["First", "Second", "Third"] {
        let id = draft_with_manuscript(&mut w, &cast, title);
        drive(&mut w, &cast, id, TO_ACCEPTED);
        w.add_article_to_issue(&cast.admin, &issue.id, &id).unwrap();
        members.push(id);
    }

    let mut request = PublishRequest::new(issue.id);
    request.dois = members
        .iter()
        .enumerate()
        .map(|(i, id)| DoiAssignment {
            article_id: *id,
            doi: format!("10.5555/jrnl.12.1.{}", i + 1),
        })
        .collect();
    let published = w.publish_issue(&cast.admin, request).unwrap();
    assert!(published.is_published);
    assert!(published.publication_date.is_some());

    for (i, id) in members.iter().enumerate() {
        let article = w.article(&cast.author, id).unwrap();
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(article.issue_id, Some(issue.id));
        assert_eq!(article.doi, Some(format!("10.5555/jrnl.12.1.{}", i + 1)));
        assert!(article.milestones.published_date.is_some());
        assert!(w.audit_article(&cast.admin, id).unwrap().is_consistent());
    }

    let stray = draft_with_manuscript(&mut w, &cast, "Too late");
    assert_eq!(
        w.add_article_to_issue(&cast.admin, &issue.id, &stray)
            .unwrap_err()
            .kind(),
        ErrorKind::IssueLocked
    );
}

#[test]
fn test_doi_for_non_member_is_rejected() {
    let cast = Cast::new();
    let mut w = workflow();
    let member = draft_with_manuscript(&mut w, &cast, "Member");
    drive(&mut w, &cast, member, TO_ACCEPTED);
    let outsider = draft_with_manuscript(&mut w, &cast, "Outsider");

    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    w.add_article_to_issue(&cast.chief, &issue.id, &member).unwrap();

    let mut request = PublishRequest::new(issue.id);
    request.dois.push(DoiAssignment {
        article_id: outsider,
        doi: "10.5555/outsider".into(),
    });
    assert_eq!(
        w.publish_issue(&cast.chief, request).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(!w.issue(&issue.id).unwrap().is_published);
}

#[test]
fn test_duplicate_dois_within_batch() {
    let cast = Cast::new();
    let mut w = workflow();
    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    let mut members = Vec::new();
    for title in ["A", "B"] {
        let id = draft_with_manuscript(&mut w, &cast, title);
        drive(&mut w, &cast, id, TO_ACCEPTED);
        w.add_article_to_issue(&cast.chief, &issue.id, &id).unwrap();
        members.push(id);
    }

    let mut request = PublishRequest::new(issue.id);
    request.dois = members
        .iter()
        .map(|id| DoiAssignment {
            article_id: *id,
            doi: "10.5555/same".into(),
        })
        .collect();
    let err = w.publish_issue(&cast.chief, request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateDoi);
    assert_eq!(
        err.details().unwrap(),
        serde_json::json!(["10.5555/same"])
    );
}

#[test]
fn test_editor_cannot_publish() {
    let cast = Cast::new();
    let mut w = workflow();
    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    assert_eq!(
        w.publish_issue(&cast.editor, PublishRequest::new(issue.id))
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
}

#[test]
fn test_issue_details_can_be_corrected() {
    let cast = Cast::new();
    let mut w = workflow();
    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    let taken = w
        .create_issue(
            &cast.chief,
            NewIssue {
                volume_number: 12,
                issue_number: 2,
                ..Default::default()
            },
        )
        .unwrap();

    let renumber = |issue_number| IssueUpdate {
        issue_number: Some(issue_number),
        ..Default::default()
    };

    assert_eq!(
        w.update_issue(&cast.editor, &issue.id, renumber(3), None)
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );

    // Renumbering onto an existing issue changes nothing
    let err = w
        .update_issue(&cast.chief, &issue.id, renumber(taken.issue_number), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(w.issue(&issue.id).unwrap(), issue);

    let updated = w
        .update_issue(&cast.admin, &issue.id, renumber(3), Some(issue.version))
        .unwrap();
    assert_eq!(updated.issue_number, 3);
    assert_eq!(updated.title, "Vol.12 No.3");
    assert_eq!(w.issue(&issue.id).unwrap(), updated);

    // The version read before the edit is now stale
    let err = w
        .update_issue(
            &cast.chief,
            &issue.id,
            IssueUpdate {
                title: Some("Spring".into()),
                ..Default::default()
            },
            Some(issue.version),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let events = w.events_for(&issue.id.to_string(), EntityType::Issue).unwrap();
    assert!(matches!(
        events.last().unwrap().payload,
        EventPayload::IssueUpdated { issue_number: 3, .. }
    ));
}

#[test]
fn test_published_issue_details_are_locked() {
    let cast = Cast::new();
    let mut w = workflow();
    let id = draft_with_manuscript(&mut w, &cast, "Locked in");
    drive(&mut w, &cast, id, TO_ACCEPTED);
    let issue = w.create_issue(&cast.chief, first_issue()).unwrap();
    w.add_article_to_issue(&cast.chief, &issue.id, &id).unwrap();
    let published = w
        .publish_issue(&cast.chief, PublishRequest::new(issue.id))
        .unwrap();

    let err = w
        .update_issue(
            &cast.chief,
            &issue.id,
            IssueUpdate {
                title: Some("Too late".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IssueLocked);
    assert_eq!(w.issue(&issue.id).unwrap(), published);
}
