//! Markdown summary generation
//!
//! This module writes a human-readable report of one invocation, including
//! run metadata, traversal and sync counts, and the items that failed.

use crate::output::{OutputResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Most failures listed per section before the rest is elided
const MAX_LISTED_FAILURES: usize = 50;

/// Writes a markdown summary of `summary` to `output_path`
///
/// # Arguments
///
/// * `summary` - The invocation summary
/// * `source_url` - Root listing URL that was mirrored
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    summary: &RunSummary,
    source_url: &str,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary, source_url);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an invocation summary as markdown
pub fn format_markdown_summary(summary: &RunSummary, source_url: &str) -> String {
    let mut md = String::new();

    md.push_str("# Listing Mirror Sync Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Source**: {}\n", source_url));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.execution_seconds
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if summary.budget_exhausted {
        md.push_str("- **Budget**: exhausted before all work was dispatched\n");
    }
    md.push('\n');

    md.push_str("## Traversal\n\n");
    md.push_str(&format!(
        "- **Directories Explored**: {}\n",
        summary.directories_explored
    ));
    md.push_str(&format!(
        "- **Directories Failed**: {}\n\n",
        summary.failed_directories
    ));

    md.push_str("## File Outcomes\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Uploaded | {} |\n", summary.files_uploaded));
    md.push_str(&format!("| Unchanged | {} |\n", summary.files_skipped));
    md.push_str(&format!(
        "| Failed Download | {} |\n",
        summary.failed_downloads
    ));
    md.push_str(&format!("| Failed Upload | {} |\n", summary.failed_uploads));
    md.push_str(&format!("| Not Attempted | {} |\n", summary.not_attempted));
    if summary.files_deferred > 0 {
        md.push_str(&format!(
            "| _of which held back by max-files_ | {} |\n",
            summary.files_deferred
        ));
    }
    md.push_str(&format!("| **Total** | {} |\n\n", summary.files_total));

    if !summary.failed_directory_urls.is_empty() {
        md.push_str("## Failed Directories\n\n");
        push_limited(
            &mut md,
            summary.failed_directory_urls.iter().map(|url| url.to_string()),
            summary.failed_directory_urls.len(),
        );
    }

    if !summary.failed_files.is_empty() {
        md.push_str("## Failed Files\n\n");
        push_limited(
            &mut md,
            summary
                .failed_files
                .iter()
                .map(|(name, state)| format!("{} ({})", name, state)),
            summary.failed_files.len(),
        );
    }

    md
}

fn push_limited(md: &mut String, items: impl Iterator<Item = String>, total: usize) {
    for item in items.take(MAX_LISTED_FAILURES) {
        md.push_str(&format!("- {}\n", item));
    }
    if total > MAX_LISTED_FAILURES {
        md.push_str(&format!(
            "\n... and {} more\n",
            total - MAX_LISTED_FAILURES
        ));
    }
    md.push('\n');
}
