//! Journal Server Binary
//!
//! Standalone server for the journal workflow API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use journal_core::JournalConfig;
use journal_server::{serve, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let project_root = std::env::current_dir().ok();
    let config = JournalConfig::load_standard(project_root.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        JournalConfig::default()
    });

    let addr = std::env::var("JOURNAL_ADDR").unwrap_or_else(|_| config.server.addr.clone());
    let db_path = std::env::var_os("JOURNAL_DB")
        .map(std::path::PathBuf::from)
        .or_else(|| config.storage.database_path.clone());

    match db_path {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            let state = Arc::new(AppState::with_database(&path, config)?);
            serve(&addr, state).await
        }
        #[cfg(not(feature = "sqlite"))]
        Some(path) => {
            tracing::warn!("Ignoring database {:?}: built without sqlite support", path);
            serve(&addr, Arc::new(AppState::in_memory(config))).await
        }
        None => {
            tracing::info!("No database configured, records are kept in memory");
            serve(&addr, Arc::new(AppState::in_memory(config))).await
        }
    }
}
