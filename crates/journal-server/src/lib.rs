//! Journal Server - HTTP API for the editorial workflow
//!
//! Thin axum layer over `journal-core`: requests are authenticated from
//! gateway headers, mapped to workflow commands, and failures are rendered
//! as `{code, message, details}` bodies.

pub mod auth;
pub mod error;
pub mod http;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use journal_core::{InMemoryStore, JournalConfig, Store, Workflow};

/// Shared application state
pub struct AppState<S: Store> {
    pub workflow: Mutex<Workflow<S>>,
}

impl<S: Store> AppState<S> {
    pub fn new(workflow: Workflow<S>) -> Self {
        Self {
            workflow: Mutex::new(workflow),
        }
    }
}

impl AppState<InMemoryStore> {
    /// Non-persistent state, for development and tests
    pub fn in_memory(config: JournalConfig) -> Self {
        Self::new(Workflow::new(InMemoryStore::new(), config))
    }
}

#[cfg(feature = "sqlite")]
impl AppState<journal_core::SqliteStore> {
    /// State backed by a SQLite database, created if missing
    pub fn with_database(
        db_path: impl AsRef<std::path::Path>,
        config: JournalConfig,
    ) -> journal_core::Result<Self> {
        let store = journal_core::SqliteStore::new(&db_path)?;
        tracing::info!("Opened journal database at {:?}", db_path.as_ref());
        Ok(Self::new(Workflow::new(store, config)))
    }
}

impl Default for AppState<InMemoryStore> {
    fn default() -> Self {
        Self::in_memory(JournalConfig::default())
    }
}

/// Create the API router
pub fn create_router<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        // Article endpoints
        .route("/articles", post(http::create_article::<S>))
        .route("/articles/{id}", get(http::get_article::<S>))
        .route("/articles/{id}", patch(http::update_article::<S>))
        .route("/articles/{id}/transition", post(http::transition_article::<S>))
        .route("/articles/{id}/rounds", post(http::start_round::<S>))
        .route("/articles/{id}/editor", put(http::assign_editor::<S>))
        .route("/articles/{id}/doi", put(http::assign_doi::<S>))
        .route("/articles/{id}/history", get(http::get_history::<S>))
        .route("/articles/{id}/audit", get(http::audit_article::<S>))
        // File endpoints
        .route("/articles/{id}/files", post(http::register_file::<S>))
        .route("/articles/{id}/files", get(http::list_files::<S>))
        .route("/files/{id}", delete(http::delete_file::<S>))
        .route("/files/{id}/active", put(http::set_file_active::<S>))
        // Review endpoints
        .route("/articles/{id}/reviews", post(http::invite_reviewer::<S>))
        .route("/articles/{id}/reviews", get(http::list_article_reviews::<S>))
        .route("/articles/{id}/reviews/batch", post(http::invite_reviewers::<S>))
        .route("/reviews", get(http::my_reviews::<S>))
        .route("/reviews/{id}", get(http::get_review::<S>))
        .route("/reviews/{id}/accept", post(http::accept_review::<S>))
        .route("/reviews/{id}/decline", post(http::decline_review::<S>))
        .route("/reviews/{id}/complete", post(http::complete_review::<S>))
        .route("/reviews/{id}/remind", post(http::remind_reviewer::<S>))
        .route("/reviews/{id}/expire", post(http::expire_review::<S>))
        // Issue endpoints
        .route("/issues", post(http::create_issue::<S>))
        .route("/issues/{id}", get(http::get_issue::<S>))
        .route("/issues/{id}", patch(http::update_issue::<S>))
        .route("/issues/{id}", delete(http::delete_issue::<S>))
        .route("/issues/{id}/articles", post(http::add_issue_article::<S>))
        .route(
            "/issues/{id}/articles/{article_id}",
            delete(http::remove_issue_article::<S>),
        )
        .route("/issues/{id}/publish", post(http::publish_issue::<S>))
        // System endpoints
        .route("/events", get(http::get_events::<S>))
        .route("/status", get(http::get_status::<S>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve<S: Store + 'static>(
    addr: &str,
    state: Arc<AppState<S>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Journal server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
