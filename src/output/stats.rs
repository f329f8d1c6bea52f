//! Statistics and console reporting
//!
//! This module prints invocation summaries and the contents of the
//! destination store (object totals and recent run history).

use crate::output::{OutputResult, RunSummary};
use crate::store::{ObjectStore, RunHistory, RunRecord, StoreStats};

/// How many past runs `--stats` shows
pub const RECENT_RUNS: usize = 10;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Object totals under every key
    pub objects: StoreStats,

    /// Objects under the configured destination prefix
    pub prefix_objects: usize,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The destination store to query
/// * `prefix` - Destination key prefix to count objects under
/// * `recent` - Number of past runs to load
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query the store
pub fn load_statistics<S>(store: &S, prefix: &str, recent: usize) -> OutputResult<StoreStatistics>
where
    S: ObjectStore + RunHistory + ?Sized,
{
    Ok(StoreStatistics {
        objects: store.stats()?,
        prefix_objects: store.list_keys(prefix)?.len(),
        recent_runs: store.latest_runs(recent)?,
    })
}

/// Prints store statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Objects:");
    println!("  Total objects: {}", stats.objects.object_count);
    println!("  Under prefix: {}", stats.prefix_objects);
    println!("  Total size: {}", format_bytes(stats.objects.total_bytes));
    println!();

    if stats.recent_runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    println!("Recent Runs ({}):", stats.recent_runs.len());
    for run in &stats.recent_runs {
        let seconds = run
            .execution_seconds
            .map(|s| format!("{:.1}s", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} [{}] uploaded {}/{} files, {} directories, {}",
            run.id,
            run.started_at,
            run.status,
            run.files_uploaded,
            run.files_total,
            run.directories_explored,
            seconds
        );
    }
}

/// Prints an invocation summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Sync Summary ===\n");
    println!("Status: {}", summary.status);
    println!("Execution time: {:.2}s", summary.execution_seconds);
    if summary.budget_exhausted {
        println!("Execution budget exhausted; results are partial");
    }
    println!();

    println!("Traversal:");
    println!("  Directories explored: {}", summary.directories_explored);
    println!("  Directories failed: {}", summary.failed_directories);
    println!();

    println!("Files:");
    println!("  Total: {}", summary.files_total);
    println!("  Uploaded: {}", summary.files_uploaded);
    println!("  Unchanged: {}", summary.files_skipped);
    println!("  Failed downloads: {}", summary.failed_downloads);
    println!("  Failed uploads: {}", summary.failed_uploads);
    println!("  Not attempted: {}", summary.not_attempted);
    if summary.files_deferred > 0 {
        println!("    held back by max-files: {}", summary.files_deferred);
    }

    if !summary.failed_files.is_empty() {
        println!();
        println!("Failed files:");
        for (name, state) in &summary.failed_files {
            println!("  - {} ({})", name, state);
        }
    }
}

/// Formats a byte count with a binary unit suffix
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
