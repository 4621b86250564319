//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - parts(id, name, description, created_at)
//! - messages(id, user_id, text, part_id -> parts.id, suggested_part, created_at)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore, HISTORY_LIMIT};
