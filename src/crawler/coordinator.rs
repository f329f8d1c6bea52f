//! Invocation coordinator - one scheduled mirror run
//!
//! This module ties the pieces of a run together:
//! - Starting the execution budget and recording the run
//! - Discovering files from the root listing
//! - Syncing them into the store under the same budget
//! - Finishing the run record and producing the summary

use crate::config::Config;
use crate::crawler::budget::BudgetGovernor;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::traversal::{DiscoveredFile, TraversalController, TraversalResult};
use crate::output::{RunStatus, RunSummary};
use crate::store::{ObjectStore, RunHistory};
use crate::sync::{SyncEngine, SyncReport};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;

/// Performs one invocation against `store`
///
/// A summary is returned for every outcome the run can reach, including a
/// root listing that cannot be fetched and a store that cannot record the
/// run; both of those yield `RunStatus::Failed`. `Err` is reserved for setup
/// problems such as an HTTP client that cannot be built.
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
/// * `store` - Destination store, also holding the run history
pub async fn run_invocation<S>(config: &Config, config_hash: &str, store: Arc<S>) -> Result<RunSummary>
where
    S: ObjectStore + RunHistory + 'static,
{
    let governor = BudgetGovernor::from_config(&config.budget);
    let mut summary = RunSummary::new(Utc::now());

    let run_id = match store.create_run(config_hash) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Cannot record run, store unusable: {}", e);
            summary.status = RunStatus::Failed;
            summary.finish(Utc::now(), governor.elapsed().as_secs_f64());
            return Ok(summary);
        }
    };
    tracing::info!("Starting run {} for {}", run_id, config.source.base_url);

    let client = build_http_client(&config.http)?;
    let traversal = TraversalController::from_config(config, client.clone(), governor)?;

    match traversal.discover().await {
        Ok(result) => {
            record_traversal(&mut summary, &result);

            let (files, deferred) = select_files(result.files, config.sync.max_files, run_id);
            let destination: Arc<dyn ObjectStore> = store.clone();
            let report = SyncEngine::from_config(config, client, destination, governor)
                .sync(files)
                .await;
            record_sync(&mut summary, &report);
            record_deferred(&mut summary, &deferred);
        }
        Err(_) => {
            summary.status = RunStatus::Failed;
        }
    }

    summary.finish(Utc::now(), governor.elapsed().as_secs_f64());

    if let Err(e) = store.finish_run(run_id, &summary) {
        tracing::warn!("Failed to finish run record {}: {}", run_id, e);
    }

    tracing::info!(
        "Run {} {}: {} of {} files uploaded, {} directories explored in {:.2}s",
        run_id,
        summary.status,
        summary.files_uploaded,
        summary.files_total,
        summary.directories_explored,
        summary.execution_seconds
    );

    Ok(summary)
}

/// Splits `files` into the ones synced this run and the ones held back
///
/// With a `max_files` cap the window of synced files starts at an offset that
/// advances with `run_id`, so successive runs cover the whole list instead of
/// always syncing the same leading names.
fn select_files(
    mut files: Vec<DiscoveredFile>,
    max_files: Option<usize>,
    run_id: i64,
) -> (Vec<DiscoveredFile>, Vec<DiscoveredFile>) {
    let total = files.len();
    let max = match max_files {
        Some(max) if max < total => max,
        _ => return (files, Vec::new()),
    };

    let run_index = usize::try_from(run_id.saturating_sub(1)).unwrap_or(0);
    let start = (run_index % total).wrapping_mul(max) % total;
    files.rotate_left(start);
    let deferred = files.split_off(max);

    tracing::warn!(
        "Discovered {} files; syncing {} starting at #{} and holding back {}",
        total,
        max,
        start,
        deferred.len()
    );

    (files, deferred)
}

fn record_traversal(summary: &mut RunSummary, result: &TraversalResult) {
    summary.directories_explored = result.directories_visited;
    summary.failed_directories = result.failed_directories.len();
    summary.failed_directory_urls = result.failed_directories.clone();
    summary.budget_exhausted = result.budget_exhausted;
}

fn record_sync(summary: &mut RunSummary, report: &SyncReport) {
    summary.files_total = report.total();
    summary.files_uploaded = report.uploaded();
    summary.files_skipped = report.skipped();
    summary.failed_downloads = report.failed_downloads();
    summary.failed_uploads = report.failed_uploads();
    summary.not_attempted = report.not_attempted();
    summary.budget_exhausted |= summary.not_attempted > 0;
    summary.failed_files = report
        .failures()
        .map(|o| (o.logical_name.clone(), o.state))
        .collect();
}

/// Counts files held back by the cap as discovered but not attempted
fn record_deferred(summary: &mut RunSummary, deferred: &[DiscoveredFile]) {
    summary.files_deferred = deferred.len();
    summary.files_total += deferred.len();
    summary.not_attempted += deferred.len();
}
