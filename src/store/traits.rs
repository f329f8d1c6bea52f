//! Store traits and error types
//!
//! This module defines the trait interface for destination object stores,
//! the run history they keep, and associated error types.

use crate::output::RunSummary;
use crate::store::{Fingerprint, RunRecord};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store rejected write to {key}: {reason}")]
    Rejected { key: String, reason: String },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate numbers about the objects held by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub object_count: u64,
    pub total_bytes: u64,
}

/// A key-value blob store with a content-fingerprint side channel
///
/// Implementations compute the fingerprint themselves when an object is
/// written, the way an object store reports an ETag. Distinct keys may be
/// written concurrently; callers never write the same key concurrently.
pub trait ObjectStore: Send + Sync {
    /// Returns true if an object is stored under `key`
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Returns the recorded fingerprint for `key`, if the object exists
    fn fingerprint(&self, key: &str) -> StoreResult<Option<Fingerprint>>;

    /// Writes `body` under `key`, replacing any previous object
    ///
    /// # Returns
    ///
    /// The fingerprint now recorded for the key
    fn put(&self, key: &str, body: &[u8]) -> StoreResult<Fingerprint>;

    /// Reads the object stored under `key`
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Lists keys starting with `prefix`, sorted
    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Counts objects and bytes held
    fn stats(&self) -> StoreResult<StoreStats>;
}

/// Persistent record of sync invocations
pub trait RunHistory: Send + Sync {
    /// Records the start of a run and returns its ID
    fn create_run(&self, config_hash: &str) -> StoreResult<i64>;

    /// Records the outcome of a run
    fn finish_run(&self, run_id: i64, summary: &RunSummary) -> StoreResult<()>;

    /// Returns up to `limit` most recent runs, newest first
    fn latest_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>>;
}
