/// File state definitions for tracking sync progress
///
/// Every discovered file walks `Discovered -> Downloaded -> terminal`, or drops
/// straight to a terminal state when it cannot be downloaded or was never
/// attempted.
use std::fmt;

/// Represents the current state of a file in one sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    // ===== Active States =====
    /// File was found by the traversal and awaits download
    Discovered,

    /// File bytes are in memory and the fingerprint is known
    Downloaded,

    // ===== Terminal Success States =====
    /// Stored fingerprint matched; nothing written
    Skipped,

    /// Bytes were written to the destination key
    Uploaded,

    // ===== Terminal Error States =====
    /// Download failed after retries
    FailedDownload,

    /// Fingerprint query or write failed
    FailedUpload,

    // ===== Special States =====
    /// Execution budget ran out before this file was started
    NotAttempted,
}

impl FileState {
    /// Returns true if this is a terminal state (no further processing in this pass)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Discovered | Self::Downloaded)
    }

    /// Returns true if the destination is known to match the source
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Skipped | Self::Uploaded)
    }

    /// Returns true if this represents a per-file failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedDownload | Self::FailedUpload)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: FileState) -> bool {
        match self {
            Self::Discovered => matches!(
                next,
                Self::Downloaded | Self::FailedDownload | Self::NotAttempted
            ),
            Self::Downloaded => {
                matches!(next, Self::Skipped | Self::Uploaded | Self::FailedUpload)
            }
            _ => false,
        }
    }

    /// Converts the state to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Downloaded => "downloaded",
            Self::Skipped => "skipped",
            Self::Uploaded => "uploaded",
            Self::FailedDownload => "failed_download",
            Self::FailedUpload => "failed_upload",
            Self::NotAttempted => "not_attempted",
        }
    }

    /// Returns all possible file states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Discovered,
            Self::Downloaded,
            Self::Skipped,
            Self::Uploaded,
            Self::FailedDownload,
            Self::FailedUpload,
            Self::NotAttempted,
        ]
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
