//! Listing-Mirror: mirrors a remote directory-listing website into an object store
//!
//! This crate walks an HTML directory listing to a bounded depth, collects the
//! data files it links to, and uploads each file to an object store only when
//! its content fingerprint differs from the one already stored.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod store;
pub mod sync;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Transient network error for {url}: {reason}")]
    TransientNetwork { url: String, reason: String },

    #[error("Permanent fetch error for {url}: {reason}")]
    PermanentFetch { url: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crawler::FetchError> for MirrorError {
    fn from(err: crawler::FetchError) -> Self {
        match err {
            crawler::FetchError::Transient { url, reason } => {
                MirrorError::TransientNetwork { url, reason }
            }
            crawler::FetchError::Permanent { url, reason } => {
                MirrorError::PermanentFetch { url, reason }
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL {url} is outside the root {root}")]
    OutsideRoot { url: String, root: String },
}

/// Result type alias for Listing-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    discover, run_invocation, BudgetGovernor, DirectoryNode, DiscoveredFile, TraversalController,
    TraversalResult, VisitedRegistry,
};
pub use output::{RunStatus, RunSummary};
pub use state::FileState;
pub use store::{Fingerprint, MemoryObjectStore, ObjectStore, SqliteObjectStore};
pub use sync::{SyncEngine, SyncReport};
pub use url::{normalize_url, LinkClass, LinkClassifier};
