//! URL handling module for Listing-Mirror
//!
//! This module provides URL normalization (the identity used to avoid
//! revisiting a listing), logical path joining, and the link classifier that
//! decides whether an href is a file, a directory, or noise.

mod classify;
mod normalize;

// Re-export main functions
pub use classify::{DirectoryEvidence, LinkClass, LinkClassifier};
pub use normalize::{join_logical, normalize_parsed, normalize_url};
