use serde::Deserialize;
use std::time::Duration;

/// Browser-like identifier; the upstream listing server rejects default client strings with 403
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Listing-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Remote listing source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Root of the directory listing; nothing outside this prefix is visited
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// File extensions treated as data files (case-insensitive, leading dot)
    #[serde(rename = "allowed-extensions", default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Substrings that mark a final segment as a data file when no extension matches,
    /// e.g. `.data.` for `pr.data.0.Current`
    #[serde(rename = "data-name-patterns", default = "default_data_name_patterns")]
    pub data_name_patterns: Vec<String>,

    /// Final path segments always treated as directories
    #[serde(rename = "directory-names", default = "default_directory_names")]
    pub directory_names: Vec<String>,

    /// HEAD-probe links that look like directories only because they lack an extension
    #[serde(rename = "probe-extensionless", default)]
    pub probe_extensionless: bool,
}

/// Directory traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    /// Maximum depth below the root listing (root is depth 0)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of concurrent listing fetches
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Delay enforced before every remote request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// Sync engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Prefix prepended to every logical name to form the destination key
    #[serde(rename = "destination-prefix", default = "default_destination_prefix")]
    pub destination_prefix: String,

    /// Number of files downloaded/uploaded concurrently
    #[serde(default = "default_sync_concurrency")]
    pub concurrency: u32,

    /// Optional cap on the number of files processed per run
    #[serde(rename = "max-files", default)]
    pub max_files: Option<usize>,
}

/// Execution budget configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    /// Hard wall-clock limit of one invocation (milliseconds)
    #[serde(rename = "max-execution-ms", default = "default_max_execution_ms")]
    pub max_execution_ms: u64,

    /// Portion of the limit reserved for wrapping up (milliseconds)
    #[serde(rename = "safety-margin-ms", default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for listing fetches and HEAD probes (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for file downloads (seconds)
    #[serde(rename = "download-timeout-secs", default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Retries after the first attempt on 429/5xx/timeouts
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry n is `backoff-factor * 2^(n-1)` seconds
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite object store
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Optional path of the markdown run report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

impl TraversalConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl BudgetConfig {
    pub fn max_execution(&self) -> Duration {
        Duration::from_millis(self.max_execution_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_concurrency: default_max_concurrency(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            destination_prefix: default_destination_prefix(),
            concurrency: default_sync_concurrency(),
            max_files: None,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_execution_ms: default_max_execution_ms(),
            safety_margin_ms: default_safety_margin_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    [
        ".txt", ".csv", ".data", ".xlsx", ".xls", ".json", ".xml", ".tsv", ".series", ".notes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_data_name_patterns() -> Vec<String> {
    [".data.", ".series", ".notes"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_directory_names() -> Vec<String> {
    ["data", "series", "time", "Current"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_concurrency() -> u32 {
    3
}

fn default_request_delay_ms() -> u64 {
    300
}

fn default_destination_prefix() -> String {
    "bls-data/".to_string()
}

fn default_sync_concurrency() -> u32 {
    2
}

fn default_max_execution_ms() -> u64 {
    840_000
}

fn default_safety_margin_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    2.0
}
