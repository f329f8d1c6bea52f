//! Store module: the destination side of the mirror
//!
//! This module handles everything written to the destination, including:
//! - The `ObjectStore` trait (exists / fingerprint / put) consumed by the sync engine
//! - Content fingerprints
//! - A SQLite-backed store and an in-memory store
//! - Run history for scheduled invocations

mod fingerprint;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use fingerprint::Fingerprint;
pub use memory::MemoryObjectStore;
pub use sqlite::SqliteObjectStore;
pub use traits::{ObjectStore, RunHistory, StoreError, StoreResult, StoreStats};

use std::path::Path;

/// Opens (or creates) the SQLite store at `path`
pub fn open_store(path: &Path) -> StoreResult<SqliteObjectStore> {
    SqliteObjectStore::new(path)
}

/// Represents a sync invocation in the run history
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub files_uploaded: usize,
    pub files_total: usize,
    pub directories_explored: usize,
    pub execution_seconds: Option<f64>,
}

/// Outcome of a sync invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// Still in progress (or interrupted before it could be finished)
    Running,
    /// Every discovered file reached a non-failure terminal state
    Succeeded,
    /// Budget truncation or per-item failures
    Partial,
    /// The root listing or the store was unusable
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}
