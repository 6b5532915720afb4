//! SQLite schema for journal storage
//!
//! Each table keeps the full record as JSON in `body`, plus the columns that
//! are queried or constrained. Uniqueness lives here, not only in the
//! workflow checks.

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Articles (aggregate root)
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    submitter_id TEXT NOT NULL,
    editor_id TEXT,
    doi TEXT UNIQUE,
    issue_id TEXT,
    current_round INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);
CREATE INDEX IF NOT EXISTS idx_articles_issue ON articles(issue_id);

-- Status history (append-only)
CREATE TABLE IF NOT EXISTS status_history (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    changed_by TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    body TEXT NOT NULL
);

-- Article files
CREATE TABLE IF NOT EXISTS article_files (
    id TEXT PRIMARY KEY,
    article_id TEXT NOT NULL,
    category TEXT NOT NULL,
    round INTEGER NOT NULL,
    file_version INTEGER NOT NULL,
    is_active INTEGER NOT NULL,
    uploaded_at TEXT NOT NULL,
    body TEXT NOT NULL,
    UNIQUE (article_id, category, round, file_version)
);

CREATE INDEX IF NOT EXISTS idx_files_article ON article_files(article_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_files_active_manuscript
    ON article_files(article_id, round)
    WHERE category = 'manuscript' AND is_active = 1;

-- Highest version ever assigned per file group
CREATE TABLE IF NOT EXISTS file_version_counters (
    article_id TEXT NOT NULL,
    category TEXT NOT NULL,
    round INTEGER NOT NULL,
    last_version INTEGER NOT NULL,
    PRIMARY KEY (article_id, category, round)
);

-- Review invitations
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    article_id TEXT NOT NULL,
    reviewer_id TEXT NOT NULL,
    round INTEGER NOT NULL,
    status TEXT NOT NULL,
    invited_at TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL,
    UNIQUE (article_id, reviewer_id)
);

CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id);
CREATE INDEX IF NOT EXISTS idx_reviews_status ON reviews(status);

-- Issues
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    volume_number INTEGER NOT NULL,
    issue_number INTEGER NOT NULL,
    is_published INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    body TEXT NOT NULL,
    UNIQUE (volume_number, issue_number)
);

-- Events (append-only event log)
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    sequence INTEGER NOT NULL UNIQUE,
    timestamp TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    payload TEXT NOT NULL,
    actor_id TEXT,
    correlation_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_sequence ON events(sequence);
CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id, entity_type);
CREATE INDEX IF NOT EXISTS idx_events_correlation ON events(correlation_id);
"#
    }

    /// Get migration SQL for a specific version
    pub fn migration(from_version: u32, to_version: u32) -> Option<&'static str> {
        match (from_version, to_version) {
            // (1, 2) => Some("ALTER TABLE ..."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_uniqueness() {
        let sql = Schema::create_tables();
        assert!(sql.contains("UNIQUE (article_id, reviewer_id)"));
        assert!(sql.contains("UNIQUE (volume_number, issue_number)"));
        assert!(sql.contains("doi TEXT UNIQUE"));
        assert!(sql.contains("idx_files_active_manuscript"));
    }

    #[test]
    fn test_no_migrations_yet() {
        assert!(Schema::migration(0, SCHEMA_VERSION).is_none());
    }
}
