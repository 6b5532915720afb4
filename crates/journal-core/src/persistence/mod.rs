//! Persistence layer for journal records
//!
//! The workflow talks to a [`Store`]. [`InMemoryStore`] is always available;
//! [`SqliteStore`] needs the `sqlite` feature.

mod memory;
#[cfg(feature = "sqlite")]
mod repository;
mod schema;
mod store;

pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use repository::SqliteStore;
pub use schema::{Schema, SCHEMA_VERSION};
pub use store::Store;
