//! State module for tracking sync progress
//!
//! # Components
//!
//! - `FileState`: Tracks the state of individual files through one sync pass
//!   (discovered, downloaded, skipped, uploaded, failed, not attempted)

mod file_state;

pub use file_state::FileState;
