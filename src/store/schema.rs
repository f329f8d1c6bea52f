//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite object store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Mirrored objects keyed by destination key
CREATE TABLE IF NOT EXISTS objects (
    key TEXT PRIMARY KEY,
    body BLOB NOT NULL,
    fingerprint TEXT NOT NULL,
    size INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

-- Track sync invocations
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    files_uploaded INTEGER NOT NULL DEFAULT 0,
    files_total INTEGER NOT NULL DEFAULT 0,
    directories_explored INTEGER NOT NULL DEFAULT 0,
    execution_seconds REAL
);

CREATE INDEX IF NOT EXISTS idx_runs_started ON runs(started_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
