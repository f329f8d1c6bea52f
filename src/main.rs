//! Listing-Mirror main entry point
//!
//! This is the command-line interface for one scheduled mirror invocation.

use anyhow::Context;
use clap::Parser;
use listing_mirror::config::{load_config_with_hash, Config};
use listing_mirror::output::{
    generate_markdown_summary, load_statistics, print_statistics, print_summary, stats,
};
use listing_mirror::store::open_store;
use listing_mirror::{discover, run_invocation, BudgetGovernor, RunStatus};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Mirror: mirrors a directory-listing website into an object store
///
/// Walks the configured listing to a bounded depth, then uploads every data
/// file whose content differs from the copy already in the store.
#[derive(Parser, Debug)]
#[command(name = "listing-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a directory-listing website into an object store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discover and list files without writing to the store
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config).await?;
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_sync(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_mirror=info,warn"),
            1 => EnvFilter::new("listing_mirror=debug,info"),
            2 => EnvFilter::new("listing_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: discovers files and lists their destination keys
async fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Listing-Mirror Dry Run ===\n");
    println!("Source: {}", config.source.base_url);
    println!("  Max depth: {}", config.traversal.max_depth);
    println!("  Max concurrency: {}", config.traversal.max_concurrency);
    println!("  Request delay: {}ms", config.traversal.request_delay_ms);
    println!("Destination prefix: {}\n", config.sync.destination_prefix);

    let governor = BudgetGovernor::from_config(&config.budget);
    let result = discover(config, governor)
        .await
        .context("root listing could not be fetched")?;

    println!("Discovered files ({}):", result.files.len());
    for file in &result.files {
        println!(
            "  {}{}  <-  {}",
            config.sync.destination_prefix, file.logical_name, file.source_url
        );
    }

    println!();
    println!("Directories explored: {}", result.directories_visited);
    if !result.failed_directories.is_empty() {
        println!("Directories failed ({}):", result.failed_directories.len());
        for url in &result.failed_directories {
            println!("  - {}", url);
        }
    }
    if result.budget_exhausted {
        println!("Execution budget exhausted; listing is incomplete");
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let statistics = load_statistics(
        &store,
        &config.sync.destination_prefix,
        stats::RECENT_RUNS,
    )?;
    print_statistics(&statistics);

    Ok(())
}

/// Handles the default mode: one full invocation
async fn handle_sync(config: &Config, config_hash: &str) -> anyhow::Result<ExitCode> {
    let store = Arc::new(open_store(Path::new(&config.output.database_path))?);

    let summary = run_invocation(config, config_hash, store).await?;
    print_summary(&summary);

    if let Some(path) = &config.output.summary_path {
        generate_markdown_summary(&summary, &config.source.base_url, Path::new(path))
            .with_context(|| format!("failed to write summary to {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    tracing::debug!("Notification payload:\n{}", summary.notification_payload());

    if summary.status == RunStatus::Failed {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
