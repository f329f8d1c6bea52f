//! SQLite object store implementation
//!
//! This module provides a SQLite-backed implementation of the ObjectStore
//! and RunHistory traits. Object bodies live in a BLOB column next to the
//! fingerprint computed at write time.

use crate::output::RunSummary;
use crate::store::schema::initialize_schema;
use crate::store::traits::{ObjectStore, RunHistory, StoreError, StoreResult, StoreStats};
use crate::store::{Fingerprint, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite object store backend
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
}

impl SqliteObjectStore {
    /// Opens or creates a store at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteObjectStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ObjectStore for SqliteObjectStore {
    fn exists(&self, key: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM objects WHERE key = ?1",
                params![key],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn fingerprint(&self, key: &str) -> StoreResult<Option<Fingerprint>> {
        let conn = self.conn()?;
        let token: Option<String> = conn
            .query_row(
                "SELECT fingerprint FROM objects WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token.map(Fingerprint::from_token))
    }

    fn put(&self, key: &str, body: &[u8]) -> StoreResult<Fingerprint> {
        let fingerprint = Fingerprint::of(body);
        let now = Utc::now().to_rfc3339();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO objects (key, body, fingerprint, size, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                fingerprint = excluded.fingerprint,
                size = excluded.size,
                updated_at = excluded.updated_at",
            params![key, body, fingerprint.as_str(), body.len() as i64, now],
        )?;

        Ok(fingerprint)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn()?;
        let body = conn
            .query_row(
                "SELECT body FROM objects WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        // substr() on TEXT counts characters, not bytes
        let mut stmt =
            conn.prepare("SELECT key FROM objects WHERE substr(key, 1, ?2) = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![prefix, prefix.chars().count() as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn()?;
        let (count, bytes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM objects",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            object_count: count as u64,
            total_bytes: bytes as u64,
        })
    }
}

impl RunHistory for SqliteObjectStore {
    fn create_run(&self, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(&self, run_id: i64, summary: &RunSummary) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, files_uploaded = ?3,
                files_total = ?4, directories_explored = ?5, execution_seconds = ?6
             WHERE id = ?7",
            params![
                summary.finished_at.to_rfc3339(),
                summary.status.to_db_string(),
                summary.files_uploaded as i64,
                summary.files_total as i64,
                summary.directories_explored as i64,
                summary.execution_seconds,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn latest_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status, files_uploaded,
                    files_total, directories_explored, execution_seconds
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                    files_uploaded: row.get::<_, i64>(5)? as usize,
                    files_total: row.get::<_, i64>(6)? as usize,
                    directories_explored: row.get::<_, i64>(7)? as usize,
                    execution_seconds: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}
