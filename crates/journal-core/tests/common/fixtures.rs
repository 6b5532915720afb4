//! Test fixture builders

use journal_core::{
    Actor, ArticleFile, ArticleId, ArticleStatus, AuthorRecord, FileCategory, FileMetadata,
    FileUpload, InMemoryStore, NewArticle, Role, Store, TransitionRequest, Workflow,
};

/// The people involved in a typical submission
pub struct Cast {
    pub author: Actor,
    pub editor: Actor,
    pub chief: Actor,
    pub admin: Actor,
    pub reviewer: Actor,
}

impl Cast {
    pub fn new() -> Self {
        Self {
            author: Actor::with_role(Role::Author),
            editor: Actor::with_role(Role::Editor),
            chief: Actor::with_role(Role::ChiefEditor),
            admin: Actor::with_role(Role::Admin),
            reviewer: Actor::with_role(Role::Reviewer),
        }
    }
}

pub fn workflow() -> Workflow<InMemoryStore> {
    Workflow::with_store(InMemoryStore::new())
}

/// A valid draft, with the submitting author listed as corresponding author
pub fn new_article(author: &Actor, title: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        abstract_text: format!("Abstract of {}.", title),
        keywords: vec!["peer review".into(), "editorial".into(), "workflow".into()],
        language: "en".to_string(),
        authors: vec![AuthorRecord {
            is_corresponding: true,
            ..AuthorRecord::with_account(author.id, "Ada Author", "ada@example.org", 1)
        }],
        ..Default::default()
    }
}

pub fn metadata(name: &str) -> FileMetadata {
    FileMetadata {
        file_name: name.to_string(),
        original_name: name.to_string(),
        file_type: "application/pdf".to_string(),
        file_size: 2048,
        file_url: format!("https://files.example.org/{}", name),
    }
}

pub fn upload<S: Store>(
    w: &mut Workflow<S>,
    actor: &Actor,
    article_id: ArticleId,
    category: FileCategory,
    name: &str,
) -> ArticleFile {
    w.register_upload(
        actor,
        FileUpload {
            article_id,
            category,
            round: None,
            metadata: metadata(name),
        },
    )
    .unwrap_or_else(|e| panic!("upload of {} failed: {}", name, e))
}

/// Create a draft with a manuscript attached
pub fn draft_with_manuscript<S: Store>(w: &mut Workflow<S>, cast: &Cast, title: &str) -> ArticleId {
    let article = w.create_article(&cast.author, new_article(&cast.author, title)).unwrap();
    upload(w, &cast.author, article.id, FileCategory::Manuscript, "manuscript.pdf");
    article.id
}

/// Walk an article through `path`, each step requested by the chief editor
pub fn drive<S: Store>(w: &mut Workflow<S>, cast: &Cast, id: ArticleId, path: &[ArticleStatus]) {
    for status in path {
        w.request_transition(&cast.chief, TransitionRequest::new(id, *status))
            .unwrap_or_else(|e| panic!("transition to {} failed: {}", status, e));
    }
}

pub const TO_UNDER_REVIEW: &[ArticleStatus] = &[ArticleStatus::Submitted, ArticleStatus::UnderReview];

pub const TO_ACCEPTED: &[ArticleStatus] = &[
    ArticleStatus::Submitted,
    ArticleStatus::UnderReview,
    ArticleStatus::Accepted,
];
