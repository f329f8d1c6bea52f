//! Sync module: moves discovered files into the destination store
//!
//! Each file is downloaded, fingerprinted, and written only when the
//! destination's fingerprint is missing or different, so repeated runs over
//! an unchanged source write nothing.

mod engine;

pub use engine::{destination_key, store_if_changed, FileOutcome, SyncEngine, SyncReport};
