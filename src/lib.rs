//! # Partmatch - part catalog and message classification API
//!
//! Partmatch stores a catalog of parts and a stream of user messages, and on
//! every new message asks a language model which part the message is about.
//!
//! Partmatch provides:
//! - SQLite-backed storage with a pooled connection manager
//! - A classification client for OpenAI-compatible chat-completion endpoints
//! - A GraphQL resolver layer (`parts`, `messages`, `addPart`, `addMessage`)
//! - An axum HTTP server exposing the schema at `/graphql`

pub mod model;
pub mod storage;
pub mod classify;
pub mod graphql;
pub mod server;
pub mod config;

// Re-exports for convenient access
pub use model::{HistoryEntry, Message, Part};
pub use storage::SqliteStore;
pub use classify::{Classification, ClassificationError, ClassificationService, CompletionClient};
pub use config::AppConfig;

/// Result type alias for Partmatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Partmatch operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
