//! In-memory object store
//!
//! Holds objects in a map behind a mutex. Used by tests and embedders; it
//! counts writes and can be told to reject writes to specific keys.

use crate::output::RunSummary;
use crate::store::traits::{ObjectStore, RunHistory, StoreError, StoreResult, StoreStats};
use crate::store::{Fingerprint, RunRecord, RunStatus};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    fingerprint: Fingerprint,
}

/// Object store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
    runs: Mutex<Vec<RunRecord>>,
    puts: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| StoreError::Poisoned)
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` to `key` fail
    pub fn fail_puts_to(&self, key: &str) {
        if let Ok(mut keys) = self.failing_keys.lock() {
            keys.insert(key.to_string());
        }
    }

    /// Number of successful `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(lock(&self.objects)?.contains_key(key))
    }

    fn fingerprint(&self, key: &str) -> StoreResult<Option<Fingerprint>> {
        Ok(lock(&self.objects)?
            .get(key)
            .map(|obj| obj.fingerprint.clone()))
    }

    fn put(&self, key: &str, body: &[u8]) -> StoreResult<Fingerprint> {
        if lock(&self.failing_keys)?.contains(key) {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                reason: "write rejected by store".to_string(),
            });
        }

        let fingerprint = Fingerprint::of(body);
        lock(&self.objects)?.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                fingerprint: fingerprint.clone(),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(fingerprint)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(lock(&self.objects)?.get(key).map(|obj| obj.body.clone()))
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(lock(&self.objects)?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        let objects = lock(&self.objects)?;
        Ok(StoreStats {
            object_count: objects.len() as u64,
            total_bytes: objects.values().map(|obj| obj.body.len() as u64).sum(),
        })
    }
}

impl RunHistory for MemoryObjectStore {
    fn create_run(&self, config_hash: &str) -> StoreResult<i64> {
        let mut runs = lock(&self.runs)?;
        let id = runs.len() as i64 + 1;
        runs.push(RunRecord {
            id,
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            files_uploaded: 0,
            files_total: 0,
            directories_explored: 0,
            execution_seconds: None,
        });
        Ok(id)
    }

    fn finish_run(&self, run_id: i64, summary: &RunSummary) -> StoreResult<()> {
        let mut runs = lock(&self.runs)?;
        let run = runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;

        run.finished_at = Some(summary.finished_at.to_rfc3339());
        run.status = summary.status;
        run.files_uploaded = summary.files_uploaded;
        run.files_total = summary.files_total;
        run.directories_explored = summary.directories_explored;
        run.execution_seconds = Some(summary.execution_seconds);
        Ok(())
    }

    fn latest_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        Ok(lock(&self.runs)?.iter().rev().take(limit).cloned().collect())
    }
}
