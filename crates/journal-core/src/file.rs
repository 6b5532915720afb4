//! Article file records, versioned per (article, category, round)
//!
//! Only metadata and a storage locator are kept here; the bytes live in an
//! external object store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::UserId;
use crate::article::ArticleId;
use crate::error::{JournalError, ParseEnumError, Result};

/// Unique identifier for a file record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid file id {:?}: {}", s, e)))
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a file is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Manuscript,
    Cover,
    Figure,
    Supplement,
    Revision,
    ResponseToReviewer,
}

impl FileCategory {
    pub const ALL: [FileCategory; 6] = [
        FileCategory::Manuscript,
        FileCategory::Cover,
        FileCategory::Figure,
        FileCategory::Supplement,
        FileCategory::Revision,
        FileCategory::ResponseToReviewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Manuscript => "manuscript",
            FileCategory::Cover => "cover",
            FileCategory::Figure => "figure",
            FileCategory::Supplement => "supplement",
            FileCategory::Revision => "revision",
            FileCategory::ResponseToReviewer => "responseToReviewer",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("file category", s))
    }
}

/// Metadata handed over by the upload layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetadata {
    /// Stored name
    pub file_name: String,
    /// Name on the uploader's machine
    pub original_name: String,
    /// MIME type
    pub file_type: String,
    pub file_size: u64,
    /// Locator in the external object store
    pub file_url: String,
}

impl FileMetadata {
    pub fn validate(&self) -> Result<()> {
        if self.file_url.trim().is_empty() {
            return Err(JournalError::Validation("file_url is required".to_string()));
        }
        if self.original_name.trim().is_empty() {
            return Err(JournalError::Validation("original_name is required".to_string()));
        }
        Ok(())
    }
}

/// A registered upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFile {
    pub id: FileId,
    pub article_id: ArticleId,
    pub category: FileCategory,
    pub round: u32,
    /// Sequential within (article, category, round), starting at 1
    pub file_version: u32,
    pub is_active: bool,
    pub uploaded_by: UserId,
    pub metadata: FileMetadata,
    pub uploaded_at: DateTime<Utc>,
}

impl ArticleFile {
    /// Whether two files belong to the same version group
    pub fn same_group(&self, article_id: &ArticleId, category: FileCategory, round: u32) -> bool {
        self.article_id == *article_id && self.category == category && self.round == round
    }
}

/// Upload request for [`crate::Workflow::register_upload`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub article_id: ArticleId,
    pub category: FileCategory,
    /// Defaults to the article's current round
    #[serde(default)]
    pub round: Option<u32>,
    pub metadata: FileMetadata,
}

/// Optional narrowing of a file listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFilter {
    pub round: Option<u32>,
    pub category: Option<FileCategory>,
}

impl FileFilter {
    pub fn matches(&self, file: &ArticleFile) -> bool {
        self.round.map_or(true, |r| file.round == r)
            && self.category.map_or(true, |c| file.category == c)
    }
}

/// Order a listing: newest round first, then category, then newest upload
pub fn sort_listing(files: &mut [ArticleFile]) {
    files.sort_by(|a, b| {
        b.round
            .cmp(&a.round)
            .then(a.category.cmp(&b.category))
            .then(b.uploaded_at.cmp(&a.uploaded_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn file(round: u32, category: FileCategory, minutes: i64) -> ArticleFile {
        ArticleFile {
            id: FileId::new(),
            article_id: ArticleId::new(),
            category,
            round,
            file_version: 1,
            is_active: true,
            uploaded_by: UserId::new(),
            metadata: FileMetadata::default(),
            uploaded_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_listing_order() {
        let mut files = vec![
            file(1, FileCategory::Manuscript, 0),
            file(2, FileCategory::Figure, 0),
            file(2, FileCategory::Manuscript, 1),
            file(2, FileCategory::Manuscript, 5),
        ];
        let newest = files[3].id;
        sort_listing(&mut files);
        assert_eq!(files[0].id, newest);
        assert_eq!(files[2].category, FileCategory::Figure);
        assert_eq!(files[3].round, 1);
    }

    #[test]
    fn test_filter() {
        let f = file(2, FileCategory::Cover, 0);
        assert!(FileFilter::default().matches(&f));
        assert!(FileFilter { round: Some(2), category: None }.matches(&f));
        assert!(!FileFilter { round: Some(1), category: None }.matches(&f));
        assert!(!FileFilter { round: None, category: Some(FileCategory::Figure) }.matches(&f));
    }

    #[test]
    fn test_metadata_requires_locator() {
        let mut metadata = FileMetadata {
            original_name: "paper.pdf".into(),
            ..Default::default()
        };
        assert!(metadata.validate().is_err());
        metadata.file_url = "s3://bucket/paper.pdf".into();
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(
            "responseToReviewer".parse::<FileCategory>().unwrap(),
            FileCategory::ResponseToReviewer
        );
        assert!("thumbnail".parse::<FileCategory>().is_err());
    }
}
