//! Configuration for journal-core
//!
//! Keyword bounds, default review deadlines, storage location and the
//! server address. Every section has defaults, so a config file only needs
//! the values it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for the default review deadlines
pub const MAX_DEADLINE_DAYS: i64 = 3650;

/// Workflow-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Article content rules
    pub article: ArticleConfig,
    /// Review invitation defaults
    pub review: ReviewConfig,
    /// Where records are kept
    pub storage: StorageConfig,
    /// HTTP server settings
    pub server: ServerConfig,
}

/// Article content rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleConfig {
    pub min_keywords: usize,
    pub max_keywords: usize,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            min_keywords: 3,
            max_keywords: 10,
        }
    }
}

/// Defaults applied when an invitation omits its deadlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Days the reviewer has to accept or decline
    pub default_response_days: i64,
    /// Days the reviewer has to submit the review
    pub default_review_days: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_response_days: 14,
            default_review_days: 30,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; the in-memory store is used when absent
    pub database_path: Option<PathBuf>,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl JournalConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from standard locations
    ///
    /// Reads `~/.journal/config.toml`, then `<project>/.journal/config.toml`.
    /// Values from later files override earlier ones key by key.
    pub fn load_standard(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();

        if let Some(home) = dirs::home_dir() {
            merge_file(&mut merged, &home.join(".journal").join("config.toml"))?;
        }

        if let Some(root) = project_root {
            merge_file(&mut merged, &root.join(".journal").join("config.toml"))?;
        }

        let config: JournalConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.article.min_keywords == 0 {
            return Err(ConfigError::OutOfRange(
                "min_keywords must be at least 1".to_string(),
            ));
        }

        if self.article.min_keywords > self.article.max_keywords {
            return Err(ConfigError::OutOfRange(
                "min_keywords must not exceed max_keywords".to_string(),
            ));
        }

        if self.review.default_response_days <= 0 || self.review.default_review_days <= 0 {
            return Err(ConfigError::OutOfRange(
                "review deadlines must be positive".to_string(),
            ));
        }

        if self.review.default_review_days > MAX_DEADLINE_DAYS {
            return Err(ConfigError::OutOfRange(format!(
                "review deadlines must be at most {} days",
                MAX_DEADLINE_DAYS
            )));
        }

        if self.review.default_response_days > self.review.default_review_days {
            return Err(ConfigError::OutOfRange(
                "default_response_days must not exceed default_review_days".to_string(),
            ));
        }

        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }

        Ok(())
    }
}

fn merge_file(into: &mut toml::Table, path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    merge_tables(into, table);
    Ok(())
}

fn merge_tables(into: &mut toml::Table, from: toml::Table) {
    for (key, value) in from {
        match value {
            toml::Value::Table(incoming) => match into.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    into.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                into.insert(key, value);
            }
        }
    }
}

/// Configuration loading or validation error
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
}
