//! Invocation summary
//!
//! A `RunSummary` is produced by every invocation, including ones that fail
//! outright, and is what gets printed, persisted in the run history, written
//! to the markdown report and handed to the downstream notification.

use crate::state::FileState;
use crate::store::RunStatus;
use chrono::{DateTime, Utc};

/// Result of one scheduled invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub status: RunStatus,

    // Sync counts
    pub files_uploaded: usize,
    pub files_total: usize,
    pub files_skipped: usize,
    pub failed_downloads: usize,
    pub failed_uploads: usize,
    pub not_attempted: usize,
    /// Files held back by `sync.max-files`; included in `not_attempted`
    pub files_deferred: usize,

    // Traversal counts
    pub directories_explored: usize,
    pub failed_directories: usize,

    /// The execution budget ran out before all work was dispatched
    pub budget_exhausted: bool,

    /// Logical names of files that ended in a failure state
    pub failed_files: Vec<(String, FileState)>,

    /// Listing URLs that could not be fetched
    pub failed_directory_urls: Vec<String>,

    pub execution_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Creates an empty summary for an invocation that started at `started_at`
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Running,
            files_uploaded: 0,
            files_total: 0,
            files_skipped: 0,
            failed_downloads: 0,
            failed_uploads: 0,
            not_attempted: 0,
            files_deferred: 0,
            directories_explored: 0,
            failed_directories: 0,
            budget_exhausted: false,
            failed_files: Vec::new(),
            failed_directory_urls: Vec::new(),
            execution_seconds: 0.0,
            started_at,
            finished_at: started_at,
        }
    }

    /// Returns true if any directory or file ended in a failure state
    pub fn has_item_failures(&self) -> bool {
        self.failed_directories > 0 || self.failed_downloads > 0 || self.failed_uploads > 0
    }

    /// Stamps the finish time and derives the final status
    ///
    /// A summary already marked `Failed` stays failed. Otherwise the run is
    /// `Partial` when it was truncated or lost any item, and `Succeeded` when
    /// every discovered file reached the destination.
    pub fn finish(&mut self, finished_at: DateTime<Utc>, execution_seconds: f64) {
        self.finished_at = finished_at;
        self.execution_seconds = execution_seconds;

        if self.status == RunStatus::Failed {
            return;
        }

        self.status = if self.budget_exhausted || self.not_attempted > 0 || self.has_item_failures()
        {
            RunStatus::Partial
        } else {
            RunStatus::Succeeded
        };
    }

    /// Renders the summary as `key=value` lines for an external trigger
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use listing_mirror::RunSummary;
    ///
    /// let mut summary = RunSummary::new(Utc::now());
    /// summary.files_uploaded = 2;
    /// summary.finish(Utc::now(), 1.5);
    ///
    /// let payload = summary.notification_payload();
    /// assert!(payload.contains("status=succeeded\n"));
    /// assert!(payload.contains("files_uploaded=2\n"));
    /// ```
    pub fn notification_payload(&self) -> String {
        let fields: [(&str, String); 13] = [
            ("status", self.status.to_string()),
            ("files_uploaded", self.files_uploaded.to_string()),
            ("files_total", self.files_total.to_string()),
            ("files_skipped", self.files_skipped.to_string()),
            ("failed_downloads", self.failed_downloads.to_string()),
            ("failed_uploads", self.failed_uploads.to_string()),
            ("not_attempted", self.not_attempted.to_string()),
            ("files_deferred", self.files_deferred.to_string()),
            ("directories_explored", self.directories_explored.to_string()),
            ("failed_directories", self.failed_directories.to_string()),
            ("budget_exhausted", self.budget_exhausted.to_string()),
            ("execution_seconds", format!("{:.3}", self.execution_seconds)),
            ("finished_at", self.finished_at.to_rfc3339()),
        ];

        fields
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }
}
