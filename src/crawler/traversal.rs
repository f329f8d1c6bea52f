//! Traversal controller
//!
//! Walks the listing tree from the configured root. Every directory is an
//! `explore` task: it claims its URL in the visited registry, fetches and
//! classifies its listing, and fans its subdirectories out to a bounded pool
//! of child tasks. Results fan back in as each child finishes.
//!
//! The execution budget is checked before a node is explored, before each
//! child is dispatched, and bounds every wait on children. When it runs out,
//! children still in flight are detached and whatever has been gathered is
//! returned.

use crate::config::Config;
use crate::crawler::budget::BudgetGovernor;
use crate::crawler::fetcher::{build_http_client, is_html, FetchError, Fetcher, RetryPolicy};
use crate::crawler::gate::RequestGate;
use crate::crawler::parser::parse_listing;
use crate::crawler::visited::VisitedRegistry;
use crate::url::{join_logical, DirectoryEvidence, LinkClass, LinkClassifier};
use crate::{MirrorError, Result};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// A directory waiting to be explored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub url: Url,
    /// Logical path from the root, forward-slash separated; empty for the root
    pub relative_path: String,
    pub depth: u32,
}

impl DirectoryNode {
    pub fn root(url: Url) -> Self {
        Self {
            url,
            relative_path: String::new(),
            depth: 0,
        }
    }
}

/// A file found in some listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Stable synchronization identity; the destination key is `prefix + logical_name`
    pub logical_name: String,
    pub source_url: Url,
    /// Depth of the listing the file was found in
    pub depth: u32,
}

/// Aggregated outcome of a discovery run
#[derive(Debug, Clone, Default)]
pub struct TraversalResult {
    pub files: Vec<DiscoveredFile>,

    /// Listings fetched and parsed
    pub directories_visited: usize,

    /// Listing URLs whose fetch failed
    pub failed_directories: Vec<String>,

    /// Some work was skipped or abandoned because the budget ran out
    pub budget_exhausted: bool,

    /// Subdirectories not followed because of the depth limit
    pub depth_truncated: usize,
}

impl TraversalResult {
    /// Folds a child's result into this one
    pub fn merge(&mut self, other: TraversalResult) {
        self.files.extend(other.files);
        self.directories_visited += other.directories_visited;
        self.failed_directories.extend(other.failed_directories);
        self.budget_exhausted |= other.budget_exhausted;
        self.depth_truncated += other.depth_truncated;
    }

    /// Sorts files by logical name and keeps one entry per source URL
    pub fn dedup_by_source(&mut self) {
        self.files.sort_by(|a, b| {
            a.logical_name
                .cmp(&b.logical_name)
                .then_with(|| a.source_url.as_str().cmp(b.source_url.as_str()))
        });

        let mut seen = HashSet::new();
        self.files
            .retain(|file| seen.insert(file.source_url.as_str().to_string()));
    }

    /// Logical names of all files, in result order
    pub fn logical_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.logical_name.as_str()).collect()
    }
}

/// Limits and switches for a discovery run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalOptions {
    pub max_depth: u32,
    /// Width of each directory's child pool
    pub max_concurrency: usize,
    /// HEAD-probe extension-less links before treating them as directories
    pub probe_extensionless: bool,
    pub listing_timeout: Duration,
}

impl TraversalOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_depth: config.traversal.max_depth,
            max_concurrency: config.traversal.max_concurrency as usize,
            probe_extensionless: config.source.probe_extensionless,
            listing_timeout: config.http.timeout(),
        }
    }
}

struct Context {
    fetcher: Fetcher,
    classifier: LinkClassifier,
    visited: Arc<VisitedRegistry>,
    governor: BudgetGovernor,
    options: TraversalOptions,
}

type ExploreFuture =
    Pin<Box<dyn Future<Output = std::result::Result<TraversalResult, FetchError>> + Send>>;

/// Discovers every file reachable from the classifier's root
pub struct TraversalController {
    fetcher: Fetcher,
    classifier: LinkClassifier,
    governor: BudgetGovernor,
    options: TraversalOptions,
}

impl TraversalController {
    pub fn new(
        fetcher: Fetcher,
        classifier: LinkClassifier,
        governor: BudgetGovernor,
        options: TraversalOptions,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            governor,
            options,
        }
    }

    /// Builds a controller with its own request gate
    ///
    /// The gate admits `traversal.max-concurrency` listing requests at once and
    /// spaces them by `traversal.request-delay-ms`.
    pub fn from_config(config: &Config, client: Client, governor: BudgetGovernor) -> Result<Self> {
        let gate = RequestGate::new(
            config.traversal.max_concurrency as usize,
            config.traversal.request_delay(),
        );
        let fetcher = Fetcher::new(client, Arc::new(gate), RetryPolicy::from_config(&config.http))
            .with_deadline(governor.deadline());
        let classifier = LinkClassifier::from_config(&config.source)?;

        Ok(Self::new(
            fetcher,
            classifier,
            governor,
            TraversalOptions::from_config(config),
        ))
    }

    /// Listing and probe requests issued so far
    pub fn requests_issued(&self) -> usize {
        self.fetcher.gate().requests_issued()
    }

    /// Runs discovery with a fresh visited registry
    pub async fn discover(&self) -> Result<TraversalResult> {
        self.discover_with(Arc::new(VisitedRegistry::new())).await
    }

    /// Runs discovery against the given visited registry
    ///
    /// # Returns
    ///
    /// * `Ok(TraversalResult)` - Files found, deduplicated by source URL
    /// * `Err(MirrorError)` - The root listing itself could not be fetched
    pub async fn discover_with(&self, visited: Arc<VisitedRegistry>) -> Result<TraversalResult> {
        let root = self.classifier.root().clone();
        tracing::info!(
            "Discovering files under {} (max depth {}, concurrency {})",
            root,
            self.options.max_depth,
            self.options.max_concurrency
        );

        let ctx = Arc::new(Context {
            fetcher: self.fetcher.clone(),
            classifier: self.classifier.clone(),
            visited,
            governor: self.governor,
            options: self.options,
        });

        let mut result = explore(ctx, DirectoryNode::root(root.clone()))
            .await
            .map_err(|e| {
                tracing::error!("Root listing {} failed: {}", root, e);
                MirrorError::from(e)
            })?;
        result.dedup_by_source();

        tracing::info!(
            "Discovery finished: {} files in {} directories ({} failed, {} beyond depth limit{})",
            result.files.len(),
            result.directories_visited,
            result.failed_directories.len(),
            result.depth_truncated,
            if result.budget_exhausted {
                ", budget exhausted"
            } else {
                ""
            }
        );

        Ok(result)
    }
}

/// Runs one discovery for `config` with a new HTTP client
///
/// # Example
///
/// ```no_run
/// use listing_mirror::config::load_config;
/// use listing_mirror::{discover, BudgetGovernor};
/// use std::path::Path;
///
/// # async fn run() -> listing_mirror::Result<()> {
/// let config = load_config(Path::new("mirror.toml"))?;
/// let governor = BudgetGovernor::from_config(&config.budget);
/// let result = discover(&config, governor).await?;
/// println!("{} files", result.files.len());
/// # Ok(())
/// # }
/// ```
pub async fn discover(config: &Config, governor: BudgetGovernor) -> Result<TraversalResult> {
    let client = build_http_client(&config.http)?;
    TraversalController::from_config(config, client, governor)?
        .discover()
        .await
}

fn explore(ctx: Arc<Context>, node: DirectoryNode) -> ExploreFuture {
    Box::pin(async move {
        let mut result = TraversalResult::default();

        if node.depth > ctx.options.max_depth {
            tracing::warn!("Depth limit reached at {}", node.url);
            result.depth_truncated = 1;
            return Ok(result);
        }

        if !ctx.governor.has_budget() {
            tracing::warn!("Execution budget exhausted before exploring {}", node.url);
            result.budget_exhausted = true;
            return Ok(result);
        }

        if !ctx.visited.try_mark(&node.url) {
            tracing::debug!("Already visited {}", node.url);
            return Ok(result);
        }

        let listing = ctx
            .fetcher
            .fetch_listing(&node.url, ctx.options.listing_timeout)
            .await?;
        result.directories_visited = 1;

        let parsed = parse_listing(&listing.html);
        tracing::debug!(
            "Listing {} ({}) has {} links",
            node.url,
            parsed.title.as_deref().unwrap_or("untitled"),
            parsed.hrefs.len()
        );

        let children =
            classify_links(&ctx, &node, &listing.final_url, &parsed.hrefs, &mut result).await;
        dispatch_children(&ctx, children, &mut result).await;

        Ok(result)
    })
}

/// Sorts a listing's hrefs into files (recorded in `result`) and child nodes
async fn classify_links(
    ctx: &Context,
    node: &DirectoryNode,
    base: &Url,
    hrefs: &[String],
    result: &mut TraversalResult,
) -> VecDeque<DirectoryNode> {
    let mut children = VecDeque::new();
    let mut queued = HashSet::new();

    for href in hrefs {
        let (url, evidence) = match ctx.classifier.classify(href, base) {
            LinkClass::Skip => {
                tracing::trace!("Skipping {:?} on {}", href, base);
                continue;
            }
            LinkClass::File(url) => {
                result.files.push(discovered_file(ctx, node, href, url));
                continue;
            }
            LinkClass::Directory(url, evidence) => (url, evidence),
        };

        if evidence == DirectoryEvidence::Extensionless && ctx.options.probe_extensionless {
            match ctx
                .fetcher
                .probe_content_type(&url, ctx.options.listing_timeout)
                .await
            {
                Ok(Some(content_type)) if !is_html(&content_type) => {
                    tracing::debug!("{} is a {} file, not a listing", url, content_type);
                    result.files.push(discovered_file(ctx, node, href, url));
                    continue;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Probe failed, treating {} as a directory: {}", url, e),
            }
        }

        if node.depth + 1 > ctx.options.max_depth {
            tracing::debug!("Not following {}: beyond depth limit", url);
            result.depth_truncated += 1;
            continue;
        }

        if ctx.visited.contains(&url) || !queued.insert(VisitedRegistry::key_for(&url)) {
            continue;
        }

        let relative_path = ctx
            .classifier
            .relative_path(&url)
            .unwrap_or_else(|_| join_logical(&node.relative_path, href));

        children.push_back(DirectoryNode {
            url,
            relative_path,
            depth: node.depth + 1,
        });
    }

    children
}

fn discovered_file(ctx: &Context, node: &DirectoryNode, href: &str, url: Url) -> DiscoveredFile {
    let logical_name = ctx
        .classifier
        .relative_path(&url)
        .unwrap_or_else(|_| join_logical(&node.relative_path, href));

    tracing::debug!("Discovered {} at depth {}", logical_name, node.depth);

    DiscoveredFile {
        logical_name,
        source_url: url,
        depth: node.depth,
    }
}

/// Explores `children` through a pool of at most `max_concurrency` tasks
async fn dispatch_children(
    ctx: &Arc<Context>,
    mut children: VecDeque<DirectoryNode>,
    result: &mut TraversalResult,
) {
    if children.is_empty() {
        return;
    }

    let width = ctx.options.max_concurrency.min(children.len()).max(1);
    let mut workers = JoinSet::new();

    loop {
        while workers.len() < width {
            let Some(child) = children.pop_front() else {
                break;
            };

            if !ctx.governor.has_budget() {
                tracing::warn!(
                    "Execution budget exhausted; {} subdirectories not dispatched",
                    children.len() + 1
                );
                result.budget_exhausted = true;
                children.clear();
                break;
            }

            let url = child.url.to_string();
            let task = explore(Arc::clone(ctx), child);
            workers.spawn(async move { (url, task.await) });
        }

        if workers.is_empty() {
            break;
        }

        match tokio::time::timeout_at(ctx.governor.deadline(), workers.join_next()).await {
            Err(_) => {
                tracing::warn!(
                    "Execution budget exhausted; abandoning {} in-flight subdirectories",
                    workers.len()
                );
                result.budget_exhausted = true;
                workers.detach_all();
                break;
            }
            Ok(None) => break,
            Ok(Some(Ok((_, Ok(child))))) => result.merge(child),
            Ok(Some(Ok((url, Err(e))))) => {
                tracing::warn!("Failed to explore {}: {}", url, e);
                result.failed_directories.push(url);
            }
            Ok(Some(Err(e))) => {
                tracing::error!("Traversal task failed: {}", e);
            }
        }
    }
}
