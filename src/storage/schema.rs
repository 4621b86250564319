//! Database schema definitions

/// SQL to create the parts table
pub const CREATE_PARTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)
"#;

/// SQL to create the messages table
/// `suggested_part` keeps the raw model answer, `part_id` the resolved link (if any)
pub const CREATE_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    text TEXT NOT NULL,
    part_id INTEGER REFERENCES parts(id),
    suggested_part TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_parts_name ON parts(name)",
    "CREATE INDEX IF NOT EXISTS idx_parts_created ON parts(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_part ON messages(part_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_PARTS_TABLE, CREATE_MESSAGES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
