//! SQLite storage implementation

use std::path::Path;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use crate::classify::Classification;
use crate::model::{HistoryEntry, Message, Part};
use crate::Result;
use super::schema;

/// Upper bound on the number of messages fed back as classification history
pub const HISTORY_LIMIT: usize = 50;

/// Pragmas applied to every pooled connection
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

const PART_COLUMNS: &str = "id, name, description, created_at";

/// SQLite-backed storage for parts and messages.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
            Ok(())
        });
        let pool = Pool::builder().build(manager)?;
        let store = Self { pool };
        store.initialize_schema()?;
        tracing::debug!("Opened store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Every in-memory connection is its own database, so the pool is pinned
    /// to a single long-lived connection.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run a blocking store operation on the runtime's blocking pool
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }

    // ========== Part Operations ==========

    /// All parts, newest first
    pub fn list_parts(&self) -> Result<Vec<Part>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PART_COLUMNS} FROM parts ORDER BY created_at DESC, id DESC"
        ))?;

        let parts = stmt
            .query_map([], row_to_part)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(parts)
    }

    /// Insert a part and return it with its generated id and timestamp
    pub fn insert_part(&self, name: &str, description: Option<&str>) -> Result<Part> {
        let conn = self.conn()?;
        let part = conn.query_row(
            &format!(
                "INSERT INTO parts (name, description) VALUES (?1, ?2) RETURNING {PART_COLUMNS}"
            ),
            params![name, description],
            row_to_part,
        )?;
        Ok(part)
    }

    /// Get a part by id
    pub fn get_part(&self, id: i64) -> Result<Option<Part>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {PART_COLUMNS} FROM parts WHERE id = ?1"),
            [id],
            row_to_part,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Names of every part, in insertion order
    pub fn part_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM parts ORDER BY id")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(names)
    }

    pub fn count_parts(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM parts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Message Operations ==========

    /// All messages, newest first, with the linked part's name (left join)
    pub fn list_messages(&self) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.user_id, m.text, m.part_id, m.suggested_part, m.created_at, p.name
            FROM messages m
            LEFT JOIN parts p ON m.part_id = p.id
            ORDER BY m.created_at DESC, m.id DESC
            "#,
        )?;

        let messages = stmt
            .query_map([], |row| row_to_message(row, row.get(6)?))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    /// Insert a message whose `part_id` is looked up from `label`.
    ///
    /// The label is stored verbatim as `suggested_part`; duplicate part names
    /// resolve to the lowest id. Lookup and insert share one IMMEDIATE
    /// transaction, which takes the write lock before the lookup reads.
    pub fn insert_message(
        &self,
        user_id: &str,
        text: &str,
        label: &str,
    ) -> Result<(Message, Classification)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let classification = resolve_with(&tx, label)?;
        let part_name = classification.part_id().map(|_| classification.label().to_string());

        let message = tx.query_row(
            r#"
            INSERT INTO messages (user_id, text, part_id, suggested_part)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, text, part_id, suggested_part, created_at
            "#,
            params![user_id, text, classification.part_id(), classification.label()],
            |row| row_to_message(row, part_name),
        )?;

        tx.commit()?;
        Ok((message, classification))
    }

    /// Most recent messages and their labels, newest first, capped at [`HISTORY_LIMIT`]
    pub fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let limit = limit.min(HISTORY_LIMIT) as i64;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT text, suggested_part FROM messages ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let history = stmt
            .query_map([limit], |row| {
                Ok(HistoryEntry {
                    text: row.get(0)?,
                    suggested_part: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(history)
    }

    pub fn count_messages(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let matched: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE part_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        drop(conn);

        Ok(DbStats {
            parts: self.count_parts()?,
            messages: self.count_messages()?,
            matched_messages: matched as usize,
        })
    }
}

fn find_part_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM parts WHERE name = ?1 ORDER BY id ASC LIMIT 1",
        [name],
        |row| row.get(0),
    )
    .optional()
}

fn resolve_with(conn: &Connection, label: &str) -> rusqlite::Result<Classification> {
    Ok(match find_part_id(conn, label)? {
        Some(part_id) => Classification::MatchedPart {
            part_id,
            label: label.to_string(),
        },
        None => Classification::UnmatchedLabel(label.to_string()),
    })
}

fn row_to_part(row: &rusqlite::Row) -> rusqlite::Result<Part> {
    Ok(Part {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_message(row: &rusqlite::Row, part_name: Option<String>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        part_id: row.get(3)?,
        suggested_part: row.get(4)?,
        created_at: row.get(5)?,
        part_name,
    })
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub parts: usize,
    pub messages: usize,
    pub matched_messages: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Parts: {}", self.parts)?;
        writeln!(f, "  Messages: {}", self.messages)?;
        write!(f, "  Linked to a part: {}", self.matched_messages)
    }
}
