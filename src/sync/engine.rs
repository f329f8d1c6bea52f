//! Sync engine
//!
//! Downloads each discovered file, fingerprints the bytes, and writes them to
//! the destination only when the stored fingerprint is missing or different.
//! Per-file failures are recorded and never stop the pass.

use crate::config::Config;
use crate::crawler::{BudgetGovernor, DiscoveredFile, Fetcher, RequestGate, RetryPolicy};
use crate::state::FileState;
use crate::store::{Fingerprint, ObjectStore, StoreError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Final state of one file after a sync pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub logical_name: String,
    pub key: String,
    pub state: FileState,
    /// Failure detail for `FailedDownload` and `FailedUpload`
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(file: &DiscoveredFile, prefix: &str) -> Self {
        Self {
            logical_name: file.logical_name.clone(),
            key: destination_key(prefix, &file.logical_name),
            state: FileState::Discovered,
            error: None,
        }
    }

    /// Outcome for a file that was never started
    pub fn not_attempted(file: &DiscoveredFile, prefix: &str) -> Self {
        let mut outcome = Self::new(file, prefix);
        outcome.advance(FileState::NotAttempted);
        outcome
    }

    fn advance(&mut self, next: FileState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(&mut self, next: FileState, error: impl ToString) {
        self.advance(next);
        self.error = Some(error.to_string());
    }
}

/// Outcomes of one sync pass, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<FileOutcome>,
}

impl SyncReport {
    fn count(&self, state: FileState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn uploaded(&self) -> usize {
        self.count(FileState::Uploaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(FileState::Skipped)
    }

    pub fn failed_downloads(&self) -> usize {
        self.count(FileState::FailedDownload)
    }

    pub fn failed_uploads(&self) -> usize {
        self.count(FileState::FailedUpload)
    }

    pub fn not_attempted(&self) -> usize {
        self.count(FileState::NotAttempted)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// `(uploaded, total)`
    pub fn counts(&self) -> (usize, usize) {
        (self.uploaded(), self.total())
    }

    /// Outcomes that ended in a failure state
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failure())
    }
}

/// Destination key for a logical name
pub fn destination_key(prefix: &str, logical_name: &str) -> String {
    format!("{}{}", prefix, logical_name)
}

/// Transfers discovered files into an object store
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
    fetcher: Fetcher,
    governor: BudgetGovernor,
    prefix: String,
    concurrency: usize,
    download_timeout: Duration,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: Fetcher,
        governor: BudgetGovernor,
        prefix: impl Into<String>,
        concurrency: usize,
        download_timeout: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            governor,
            prefix: prefix.into(),
            concurrency: concurrency.max(1),
            download_timeout,
        }
    }

    /// Builds an engine with its own request gate
    ///
    /// Downloads share the listing source's rate limit contract: at most
    /// `sync.concurrency` in flight, each preceded by the request delay.
    pub fn from_config(
        config: &Config,
        client: Client,
        store: Arc<dyn ObjectStore>,
        governor: BudgetGovernor,
    ) -> Self {
        let concurrency = config.sync.concurrency as usize;
        let gate = RequestGate::new(concurrency, config.traversal.request_delay());
        let fetcher = Fetcher::new(client, Arc::new(gate), RetryPolicy::from_config(&config.http))
            .with_deadline(governor.deadline());

        Self::new(
            store,
            fetcher,
            governor,
            config.sync.destination_prefix.clone(),
            concurrency,
            config.http.download_timeout(),
        )
    }

    /// Synchronizes `files`, at most `concurrency` at a time
    ///
    /// Files are started in order; once the budget is gone no further file is
    /// started and the rest are reported as `NotAttempted`. Files already in
    /// progress are allowed to finish so no write is left half done.
    pub async fn sync(&self, files: Vec<DiscoveredFile>) -> SyncReport {
        let total = files.len();
        tracing::info!("Syncing {} files to prefix {:?}", total, self.prefix);

        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; total];
        let mut next = 0;
        let mut workers = JoinSet::new();

        loop {
            while next < total && workers.len() < self.concurrency {
                if !self.governor.has_budget() {
                    tracing::warn!(
                        "Execution budget exhausted; not starting {} remaining files",
                        total - next
                    );
                    for (index, file) in files.iter().enumerate().skip(next) {
                        outcomes[index] = Some(FileOutcome::not_attempted(file, &self.prefix));
                    }
                    next = total;
                    break;
                }

                let engine = self.clone();
                let file = files[next].clone();
                let index = next;
                workers.spawn(async move { (index, engine.sync_one(&file).await) });
                next += 1;
            }

            match workers.join_next().await {
                Some(Ok((index, outcome))) => outcomes[index] = Some(outcome),
                Some(Err(e)) => tracing::error!("Sync task failed: {}", e),
                None => break,
            }
        }

        let report = SyncReport {
            outcomes: settle_outcomes(outcomes, &files, &self.prefix),
        };

        tracing::info!(
            "Sync finished: {} uploaded, {} unchanged, {} failed downloads, {} failed uploads, {} not attempted",
            report.uploaded(),
            report.skipped(),
            report.failed_downloads(),
            report.failed_uploads(),
            report.not_attempted()
        );

        report
    }

    /// Walks one file through the state machine
    async fn sync_one(&self, file: &DiscoveredFile) -> FileOutcome {
        let mut outcome = FileOutcome::new(file, &self.prefix);

        let body = match self
            .fetcher
            .fetch_with_retry(&file.source_url, self.download_timeout)
            .await
        {
            Ok(fetched) => fetched.body,
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", file.source_url, e);
                outcome.fail(FileState::FailedDownload, e);
                return outcome;
            }
        };
        outcome.advance(FileState::Downloaded);

        let local = Fingerprint::of(&body);
        let store = Arc::clone(&self.store);
        let key = outcome.key.clone();

        let decision =
            tokio::task::spawn_blocking(move || store_if_changed(store.as_ref(), &key, &body, &local))
                .await;

        match decision {
            Ok(Ok(true)) => {
                tracing::info!("Uploaded {}", outcome.key);
                outcome.advance(FileState::Uploaded);
            }
            Ok(Ok(false)) => {
                tracing::debug!("Unchanged {}", outcome.key);
                outcome.advance(FileState::Skipped);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to store {}: {}", outcome.key, e);
                outcome.fail(FileState::FailedUpload, e);
            }
            Err(e) => {
                tracing::error!("Store task for {} failed: {}", outcome.key, e);
                outcome.fail(FileState::FailedUpload, e);
            }
        }

        outcome
    }
}

/// Fills the slot of every file whose task ended without an outcome
///
/// A task that panicked or was cancelled never reported back; its file is
/// counted as a failed download so the report still covers every input.
fn settle_outcomes(
    outcomes: Vec<Option<FileOutcome>>,
    files: &[DiscoveredFile],
    prefix: &str,
) -> Vec<FileOutcome> {
    outcomes
        .into_iter()
        .zip(files)
        .map(|(outcome, file)| {
            outcome.unwrap_or_else(|| {
                let mut lost = FileOutcome::new(file, prefix);
                lost.fail(FileState::FailedDownload, "sync task ended without an outcome");
                lost
            })
        })
        .collect()
}

/// Writes `body` under `key` unless the stored fingerprint equals `local`
///
/// # Returns
///
/// * `Ok(true)` - The key was missing or stale and has been written
/// * `Ok(false)` - The stored object already matches
/// * `Err(StoreError)` - Querying or writing failed
pub fn store_if_changed(
    store: &dyn ObjectStore,
    key: &str,
    body: &[u8],
    local: &Fingerprint,
) -> Result<bool, StoreError> {
    if store.exists(key)? {
        // An existing object without a fingerprint is rewritten
        if store.fingerprint(key)?.as_ref() == Some(local) {
            return Ok(false);
        }
    }

    store.put(key, body)?;
    Ok(true)
}
