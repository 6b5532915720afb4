//! SQLite-backed store

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, Params, Row};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::schema::{Schema, SCHEMA_VERSION};
use super::Store;
use crate::actor::UserId;
use crate::article::{Article, ArticleId, StatusHistory, StatusHistoryId};
use crate::error::{ArticleError, JournalError, PersistenceError, Result, ReviewError};
use crate::event::{EntityType, Event, EventId};
use crate::file::{ArticleFile, FileCategory, FileId};
use crate::issue::{Issue, IssueId};
use crate::review::{Review, ReviewId};

/// [`Store`] over a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let current_version = self.get_schema_version().unwrap_or(0);

        if current_version == 0 {
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    self.conn.execute_batch(migration)?;
                }
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            }
            .into());
        }

        tracing::debug!(version = SCHEMA_VERSION, "sqlite schema ready");
        Ok(())
    }

    fn get_schema_version(&self) -> Option<u32> {
        self.conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        Ok(())
    }

    fn query_body<T: DeserializeOwned>(&self, sql: &str, params: impl Params) -> Result<Option<T>> {
        let result = self.conn.query_row(sql, params, |row| body_column(row, 0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(PersistenceError::from(e).into()),
        }
    }

    fn query_bodies<T: DeserializeOwned>(&self, sql: &str, params: impl Params) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(params, |row| body_column(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// Explain why a compare-and-swap update touched no rows
    fn version_mismatch(&self, table: &str, entity: &str, id: &str, expected: u64) -> JournalError {
        let sql = format!("SELECT version FROM {} WHERE id = ?1", table);
        match self.conn.query_row(&sql, [id], |row| row.get::<_, u64>(0)) {
            Ok(actual) => JournalError::stale(format!("{} {}", entity, id), expected, actual),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                JournalError::NotFound(format!("{} {}", entity, id))
            }
            Err(e) => e.into(),
        }
    }

    fn write_file(&self, file: &ArticleFile) -> Result<usize> {
        let body = serde_json::to_string(file)?;
        self.conn
            .execute(
                "UPDATE article_files SET is_active = ?2, body = ?3 WHERE id = ?1",
                params![file.id.to_string(), file.is_active, body],
            )
            .map_err(|e| file_write_error(e, file))
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn body_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            Some(msg.as_deref().unwrap_or_default())
        }
        _ => None,
    }
}

fn article_write_error(err: rusqlite::Error, article: &Article) -> JournalError {
    match constraint_message(&err) {
        Some(msg) if msg.contains("articles.doi") => {
            ArticleError::DuplicateDoi(article.doi.clone().unwrap_or_default()).into()
        }
        Some(_) => JournalError::Conflict(format!("article {} already exists", article.id)),
        None => err.into(),
    }
}

fn file_write_error(err: rusqlite::Error, file: &ArticleFile) -> JournalError {
    match constraint_message(&err) {
        Some(msg) if msg.contains("file_version") => JournalError::Conflict(format!(
            "{} version {} already exists for round {}",
            file.category, file.file_version, file.round
        )),
        Some(_) => JournalError::Conflict(format!(
            "article {} already has an active manuscript for round {}",
            file.article_id, file.round
        )),
        None => err.into(),
    }
}

fn entity_type_from_str(idx: usize, s: &str) -> rusqlite::Result<EntityType> {
    match s {
        "article" => Ok(EntityType::Article),
        "file" => Ok(EntityType::File),
        "review" => Ok(EntityType::Review),
        "issue" => Ok(EntityType::Issue),
        other => Err(conversion_error(
            idx,
            crate::error::ParseEnumError::new("entity type", other),
        )),
    }
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let timestamp_str: String = row.get(2)?;
    let entity_type_str: String = row.get(4)?;
    let actor_str: Option<String> = row.get(6)?;

    let actor_id = actor_str
        .map(|s| Uuid::parse_str(&s).map(UserId).map_err(|e| conversion_error(6, e)))
        .transpose()?;

    Ok(Event {
        id: EventId(uuid_column(row, 0)?),
        sequence: row.get(1)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
            .map_err(|e| conversion_error(2, e))?
            .with_timezone(&Utc),
        entity_id: row.get(3)?,
        entity_type: entity_type_from_str(4, &entity_type_str)?,
        payload: body_column(row, 5)?,
        actor_id,
        correlation_id: row.get(7)?,
    })
}

const EVENT_COLUMNS: &str =
    "id, sequence, timestamp, entity_id, entity_type, payload, actor_id, correlation_id";

impl Store for SqliteStore {
    fn begin(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            return Err(PersistenceError::Transaction("transaction already open".to_string()).into());
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Err(PersistenceError::Transaction("no open transaction".to_string()).into());
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Err(PersistenceError::Transaction("no open transaction".to_string()).into());
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ==================== Article Operations ====================

    fn insert_article(&mut self, article: &Article) -> Result<()> {
        let body = serde_json::to_string(article)?;
        self.conn
            .execute(
                r#"
                INSERT INTO articles
                (id, status, submitter_id, editor_id, doi, issue_id, current_round, updated_at, version, body)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    article.id.to_string(),
                    article.status.as_str(),
                    article.submitter_id.to_string(),
                    article.editor_id.map(|id| id.to_string()),
                    article.doi,
                    article.issue_id.map(|id| id.to_string()),
                    article.current_round,
                    timestamp(&article.updated_at),
                    article.version,
                    body,
                ],
            )
            .map_err(|e| article_write_error(e, article))?;
        Ok(())
    }

    fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        self.query_body("SELECT body FROM articles WHERE id = ?1", [id.to_string()])
    }

    fn update_article(&mut self, article: &Article, expected_version: u64) -> Result<()> {
        let body = serde_json::to_string(article)?;
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE articles
                SET status = ?2, editor_id = ?3, doi = ?4, issue_id = ?5, current_round = ?6,
                    updated_at = ?7, version = ?8, body = ?9
                WHERE id = ?1 AND version = ?10
                "#,
                params![
                    article.id.to_string(),
                    article.status.as_str(),
                    article.editor_id.map(|id| id.to_string()),
                    article.doi,
                    article.issue_id.map(|id| id.to_string()),
                    article.current_round,
                    timestamp(&article.updated_at),
                    article.version,
                    body,
                    expected_version,
                ],
            )
            .map_err(|e| article_write_error(e, article))?;
        if changed == 0 {
            return Err(self.version_mismatch(
                "articles",
                "article",
                &article.id.to_string(),
                expected_version,
            ));
        }
        Ok(())
    }

    fn find_article_by_doi(&self, doi: &str) -> Result<Option<Article>> {
        self.query_body("SELECT body FROM articles WHERE doi = ?1", [doi])
    }

    // ==================== Status History Operations ====================

    fn insert_history(&mut self, record: &StatusHistory) -> Result<()> {
        let body = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO status_history (id, status, changed_by, timestamp, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.status.as_str(),
                record.changed_by.to_string(),
                timestamp(&record.timestamp),
                body,
            ],
        )?;
        Ok(())
    }

    fn get_history(&self, id: &StatusHistoryId) -> Result<Option<StatusHistory>> {
        self.query_body("SELECT body FROM status_history WHERE id = ?1", [id.to_string()])
    }

    // ==================== File Operations ====================

    fn insert_file(&mut self, file: &ArticleFile) -> Result<()> {
        let body = serde_json::to_string(file)?;
        self.conn
            .execute(
                r#"
                INSERT INTO article_files
                (id, article_id, category, round, file_version, is_active, uploaded_at, body)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    file.id.to_string(),
                    file.article_id.to_string(),
                    file.category.as_str(),
                    file.round,
                    file.file_version,
                    file.is_active,
                    timestamp(&file.uploaded_at),
                    body,
                ],
            )
            .map_err(|e| file_write_error(e, file))?;
        self.conn.execute(
            r#"
            INSERT INTO file_version_counters (article_id, category, round, last_version)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (article_id, category, round)
            DO UPDATE SET last_version = MAX(last_version, excluded.last_version)
            "#,
            params![
                file.article_id.to_string(),
                file.category.as_str(),
                file.round,
                file.file_version,
            ],
        )?;
        Ok(())
    }

    fn get_file(&self, id: &FileId) -> Result<Option<ArticleFile>> {
        self.query_body("SELECT body FROM article_files WHERE id = ?1", [id.to_string()])
    }

    fn update_file(&mut self, file: &ArticleFile) -> Result<()> {
        if self.write_file(file)? == 0 {
            return Err(JournalError::NotFound(format!("file {}", file.id)));
        }
        Ok(())
    }

    fn delete_file(&mut self, id: &FileId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM article_files WHERE id = ?1", [id.to_string()])?;
        Ok(removed > 0)
    }

    fn files_for_article(&self, article_id: &ArticleId) -> Result<Vec<ArticleFile>> {
        let mut files: Vec<ArticleFile> = self.query_bodies(
            "SELECT body FROM article_files WHERE article_id = ?1",
            [article_id.to_string()],
        )?;
        files.sort_by_key(|f| (f.round, f.category, f.file_version));
        Ok(files)
    }

    fn next_file_version(
        &self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<u32> {
        let last: u32 = self.conn.query_row(
            r#"
            SELECT COALESCE(
                (SELECT last_version FROM file_version_counters
                 WHERE article_id = ?1 AND category = ?2 AND round = ?3),
                0)
            "#,
            params![article_id.to_string(), category.as_str(), round],
            |row| row.get(0),
        )?;
        Ok(last + 1)
    }

    fn deactivate_files(
        &mut self,
        article_id: &ArticleId,
        category: FileCategory,
        round: u32,
    ) -> Result<usize> {
        let active: Vec<ArticleFile> = self.query_bodies(
            r#"
            SELECT body FROM article_files
            WHERE article_id = ?1 AND category = ?2 AND round = ?3 AND is_active = 1
            "#,
            params![article_id.to_string(), category.as_str(), round],
        )?;
        for mut file in active.iter().cloned() {
            file.is_active = false;
            self.write_file(&file)?;
        }
        Ok(active.len())
    }

    fn has_active_file(&self, article_id: &ArticleId, category: FileCategory) -> Result<bool> {
        let exists = self.conn.query_row(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM article_files
                WHERE article_id = ?1 AND category = ?2 AND is_active = 1
            )
            "#,
            params![article_id.to_string(), category.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ==================== Review Operations ====================

    fn insert_review(&mut self, review: &Review) -> Result<()> {
        let body = serde_json::to_string(review)?;
        let result = self.conn.execute(
            r#"
            INSERT INTO reviews
            (id, article_id, reviewer_id, round, status, invited_at, version, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                review.id.to_string(),
                review.article_id.to_string(),
                review.reviewer_id.to_string(),
                review.round,
                review.status.as_str(),
                timestamp(&review.invited_at),
                review.version,
                body,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_message(&e).is_some() => Err(ReviewError::DuplicateInvitation {
                article_id: review.article_id,
                reviewer_id: review.reviewer_id,
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn get_review(&self, id: &ReviewId) -> Result<Option<Review>> {
        self.query_body("SELECT body FROM reviews WHERE id = ?1", [id.to_string()])
    }

    fn update_review(&mut self, review: &Review, expected_version: u64) -> Result<()> {
        let body = serde_json::to_string(review)?;
        let changed = self.conn.execute(
            "UPDATE reviews SET status = ?2, version = ?3, body = ?4 WHERE id = ?1 AND version = ?5",
            params![
                review.id.to_string(),
                review.status.as_str(),
                review.version,
                body,
                expected_version,
            ],
        )?;
        if changed == 0 {
            return Err(self.version_mismatch(
                "reviews",
                "review",
                &review.id.to_string(),
                expected_version,
            ));
        }
        Ok(())
    }

    fn find_review(&self, article_id: &ArticleId, reviewer_id: &UserId) -> Result<Option<Review>> {
        self.query_body(
            "SELECT body FROM reviews WHERE article_id = ?1 AND reviewer_id = ?2",
            [article_id.to_string(), reviewer_id.to_string()],
        )
    }

    fn reviews_for_article(&self, article_id: &ArticleId) -> Result<Vec<Review>> {
        self.query_bodies(
            "SELECT body FROM reviews WHERE article_id = ?1 ORDER BY invited_at",
            [article_id.to_string()],
        )
    }

    fn reviews_for_reviewer(&self, reviewer_id: &UserId) -> Result<Vec<Review>> {
        self.query_bodies(
            "SELECT body FROM reviews WHERE reviewer_id = ?1 ORDER BY invited_at",
            [reviewer_id.to_string()],
        )
    }

    // ==================== Issue Operations ====================

    fn insert_issue(&mut self, issue: &Issue) -> Result<()> {
        let body = serde_json::to_string(issue)?;
        let result = self.conn.execute(
            r#"
            INSERT INTO issues (id, volume_number, issue_number, is_published, version, body)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                issue.id.to_string(),
                issue.volume_number,
                issue.issue_number,
                issue.is_published,
                issue.version,
                body,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_message(&e).is_some() => Err(JournalError::Conflict(format!(
                "volume {} issue {} already exists",
                issue.volume_number, issue.issue_number
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>> {
        self.query_body("SELECT body FROM issues WHERE id = ?1", [id.to_string()])
    }

    fn update_issue(&mut self, issue: &Issue, expected_version: u64) -> Result<()> {
        let body = serde_json::to_string(issue)?;
        let result = self.conn.execute(
            r#"
            UPDATE issues
            SET volume_number = ?2, issue_number = ?3, is_published = ?4, version = ?5, body = ?6
            WHERE id = ?1 AND version = ?7
            "#,
            params![
                issue.id.to_string(),
                issue.volume_number,
                issue.issue_number,
                issue.is_published,
                issue.version,
                body,
                expected_version,
            ],
        );
        let changed = match result {
            Ok(changed) => changed,
            Err(e) if constraint_message(&e).is_some() => {
                return Err(JournalError::Conflict(format!(
                    "volume {} issue {} already exists",
                    issue.volume_number, issue.issue_number
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if changed == 0 {
            return Err(self.version_mismatch(
                "issues",
                "issue",
                &issue.id.to_string(),
                expected_version,
            ));
        }
        Ok(())
    }

    fn delete_issue(&mut self, id: &IssueId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", [id.to_string()])?;
        Ok(removed > 0)
    }

    // ==================== Event Operations ====================

    fn append_event(&mut self, mut event: Event) -> Result<Event> {
        let sequence: u64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM events",
            [],
            |row| row.get(0),
        )?;
        event.sequence = sequence;
        let payload = serde_json::to_string(&event.payload)?;
        self.conn.execute(
            &format!("INSERT INTO events ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", EVENT_COLUMNS),
            params![
                event.id.to_string(),
                event.sequence,
                timestamp(&event.timestamp),
                event.entity_id,
                event.entity_type.as_str(),
                payload,
                event.actor_id.map(|id| id.to_string()),
                event.correlation_id,
            ],
        )?;
        Ok(event)
    }

    fn events_for_entity(&self, entity_id: &str, entity_type: EntityType) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events WHERE entity_id = ?1 AND entity_type = ?2 ORDER BY sequence",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(params![entity_id, entity_type.as_str()], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn events_after(&self, sequence: u64, limit: usize) -> Result<Vec<Event>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM events WHERE sequence > ?1 ORDER BY sequence LIMIT ?2",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(params![sequence, limit], row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn last_sequence(&self) -> Result<u64> {
        let sequence: u64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(sequence), 0) FROM events", [], |row| row.get(0))?;
        Ok(sequence)
    }
}
