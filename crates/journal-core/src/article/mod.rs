//! Articles, their status machine and status history

mod article;
mod history;
mod status;

pub use article::{Article, ArticleId, ArticleUpdate, AuthorRecord, FieldId, Milestones, NewArticle};
pub use history::{HistoryAudit, StatusHistory, StatusHistoryId};
pub use status::ArticleStatus;
