//! Visited-set registry
//!
//! One registry is shared by every traversal task of a single discovery run.
//! Whoever marks a directory first owns exploring it.

use crate::url::normalize_parsed;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// Concurrency-safe set of normalized directory URLs
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    seen: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts `url` and reports whether this call inserted it
    ///
    /// # Returns
    ///
    /// * `true` - The caller now owns exploring `url`
    /// * `false` - Another caller marked it earlier
    pub fn try_mark(&self, url: &Url) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let key = Self::key_for(url);
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(key)
    }

    /// Non-authoritative membership check, used to avoid enqueueing known nodes
    pub fn contains(&self, url: &Url) -> bool {
        let key = Self::key_for(url);
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.contains(&key)
    }

    /// Number of distinct URLs marked
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `try_mark` calls, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The identity under which `url` is recorded
    pub fn key_for(url: &Url) -> String {
        match normalize_parsed(url) {
            Ok(normalized) => normalized.to_string(),
            Err(_) => url.to_string(),
        }
    }
}
