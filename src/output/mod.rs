//! Output module for invocation summaries and reports
//!
//! This module handles:
//! - The `RunSummary` returned by every invocation
//! - Printing summaries and store statistics to the console
//! - Writing a markdown report of a run

mod markdown;
pub mod stats;
mod summary;

pub use crate::store::RunStatus;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, print_summary, StoreStatistics};
pub use summary::RunSummary;

use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
