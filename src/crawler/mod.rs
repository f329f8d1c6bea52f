//! Crawler module for walking the listing source
//!
//! This module contains the discovery side of the mirror, including:
//! - HTTP fetching with retry and backoff
//! - HTML listing parsing
//! - Request gating (concurrency limit and per-request delay)
//! - The execution budget governor and the visited-set registry
//! - The traversal controller and the per-invocation coordinator

mod budget;
mod coordinator;
mod fetcher;
mod gate;
mod parser;
mod traversal;
mod visited;

pub use budget::BudgetGovernor;
pub use coordinator::run_invocation;
pub use fetcher::{
    build_http_client, is_html, FetchError, FetchedBody, Fetcher, Listing, RetryPolicy,
};
pub use gate::{GatePermit, RequestGate};
pub use parser::{parse_listing, ParsedListing};
pub use traversal::{
    discover, DirectoryNode, DiscoveredFile, TraversalController, TraversalOptions,
    TraversalResult,
};
pub use visited::VisitedRegistry;
