use sha2::{Digest, Sha256};
use std::fmt;

/// Content-derived token used to detect whether a file changed
///
/// Two equal fingerprints mean the content is treated as unchanged. Tokens
/// are compared as opaque strings; surrounding quotes (as found on HTTP
/// ETags) are stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a byte blob (hex-encoded SHA-256)
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a token recorded by a store
    pub fn from_token(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().trim_matches('"').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
