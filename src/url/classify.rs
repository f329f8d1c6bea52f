//! Link classification for directory listings
//!
//! A listing page links to files, to subdirectories, and to a fair amount of
//! noise (parent links, sort-order links, links off the mirrored tree). This
//! module sorts each href into one of those buckets without touching the
//! network.

use crate::config::SourceConfig;
use crate::url::normalize::{join_logical, normalize_parsed};
use crate::{UrlError, UrlResult};
use percent_encoding::percent_decode_str;
use url::Url;

/// Hrefs that only point back at the current or parent listing
const SELF_OR_PARENT: &[&str] = &["", ".", "./", "..", "../", "/"];

/// Schemes a listing may link to that can never be mirrored
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Why a link was classified as a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryEvidence {
    /// The href ends with `/`
    TrailingSlash,
    /// The final segment is one of the configured directory names
    KnownName,
    /// The final segment has no `.`; may be an extension-less file
    Extensionless,
}

/// Result of classifying one href
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClass {
    /// Not part of the mirrored tree
    Skip,
    /// A data file, with its absolute URL
    File(Url),
    /// A subdirectory listing, with its absolute URL
    Directory(Url, DirectoryEvidence),
}

impl LinkClass {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Classifies listing hrefs relative to a fixed root prefix
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    root: Url,
    extensions: Vec<String>,
    name_patterns: Vec<String>,
    directory_names: Vec<String>,
}

impl LinkClassifier {
    /// Creates a classifier rooted at `root`
    ///
    /// Extensions are matched case-insensitively; a missing leading dot is added.
    pub fn new(root: Url, extensions: &[String], directory_names: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();

        Self {
            root,
            extensions,
            name_patterns: Vec::new(),
            directory_names: directory_names.to_vec(),
        }
    }

    /// Also treats final segments containing any of `patterns` as data files
    ///
    /// Listing servers publish series data under names such as
    /// `pr.data.0.Current` whose last dot-part is not an extension.
    pub fn with_name_patterns(mut self, patterns: &[String]) -> Self {
        self.name_patterns = patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Builds a classifier from the `[source]` configuration section
    pub fn from_config(config: &SourceConfig) -> UrlResult<Self> {
        let root = Url::parse(&config.base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(Self::new(
            root,
            &config.allowed_extensions,
            &config.directory_names,
        )
        .with_name_patterns(&config.data_name_patterns))
    }

    /// The root listing URL
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Classifies a raw href found on the listing at `base`
    ///
    /// # Rules
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | empty, `./`, `../`, `/`, fragment, query-only, non-HTTP scheme | Skip |
    /// | resolves outside the root prefix, or to `base` itself | Skip |
    /// | ends with `/` | Directory |
    /// | final segment is a known directory name | Directory |
    /// | final segment has an allowed extension | File |
    /// | final segment contains a data-name pattern | File |
    /// | final segment has no `.` | Directory |
    /// | anything else | Skip |
    ///
    /// # Examples
    ///
    /// ```
    /// use listing_mirror::url::{LinkClass, LinkClassifier};
    /// use url::Url;
    ///
    /// let root = Url::parse("https://example.com/pub/").unwrap();
    /// let classifier = LinkClassifier::new(root.clone(), &[".txt".to_string()], &[]);
    ///
    /// assert!(matches!(classifier.classify("a/", &root), LinkClass::Directory(..)));
    /// assert!(matches!(classifier.classify("notes.TXT", &root), LinkClass::File(_)));
    /// assert!(classifier.classify("../", &root).is_skip());
    /// ```
    pub fn classify(&self, href: &str, base: &Url) -> LinkClass {
        let href = href.trim();

        if SELF_OR_PARENT.contains(&href) || href.starts_with('#') || href.starts_with('?') {
            return LinkClass::Skip;
        }

        let lower = href.to_lowercase();
        if IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            return LinkClass::Skip;
        }

        let mut resolved = match base.join(href) {
            Ok(url) => url,
            Err(_) => return LinkClass::Skip,
        };
        resolved.set_fragment(None);

        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return LinkClass::Skip;
        }

        if !self.is_within_root(&resolved) || same_resource(&resolved, base) {
            return LinkClass::Skip;
        }

        let path = resolved.path();
        if path.ends_with('/') {
            return LinkClass::Directory(resolved, DirectoryEvidence::TrailingSlash);
        }

        let segment = path.rsplit('/').next().unwrap_or("").to_string();
        if segment.is_empty() {
            return LinkClass::Skip;
        }

        if self.directory_names.iter().any(|name| *name == segment) {
            return LinkClass::Directory(resolved, DirectoryEvidence::KnownName);
        }

        let segment_lower = segment.to_lowercase();
        if self
            .extensions
            .iter()
            .any(|ext| segment_lower.ends_with(ext.as_str()))
        {
            return LinkClass::File(resolved);
        }

        if self
            .name_patterns
            .iter()
            .any(|pattern| segment_lower.contains(pattern.as_str()))
        {
            return LinkClass::File(resolved);
        }

        if !segment.contains('.') {
            return LinkClass::Directory(resolved, DirectoryEvidence::Extensionless);
        }

        LinkClass::Skip
    }

    /// Returns true if `url` is the root itself or lies below it
    pub fn is_within_root(&self, url: &Url) -> bool {
        if url.scheme() != self.root.scheme()
            || url.host_str().map(|h| h.to_lowercase())
                != self.root.host_str().map(|h| h.to_lowercase())
            || url.port_or_known_default() != self.root.port_or_known_default()
        {
            return false;
        }

        let root_path = self.root.path();
        let root_dir = root_path.trim_end_matches('/');
        let path = url.path();

        path == root_dir || path.starts_with(&format!("{}/", root_dir))
    }

    /// Path of `url` relative to the root, forward-slash separated
    ///
    /// This is the logical name under which a file is synchronized, so it only
    /// depends on where the file lives, not on how a listing spelled its href.
    /// Segments are percent-decoded (`my%20file.txt` becomes `my file.txt`);
    /// a segment that would decode to a `/` is kept encoded.
    pub fn relative_path(&self, url: &Url) -> UrlResult<String> {
        if !self.is_within_root(url) {
            return Err(UrlError::OutsideRoot {
                url: url.to_string(),
                root: self.root.to_string(),
            });
        }

        let root_dir = self.root.path().trim_end_matches('/');
        let rest = &url.path()[root_dir.len()..];
        let decoded: Vec<String> = rest.split('/').map(decode_segment).collect();
        Ok(join_logical("", &decoded.join("/")))
    }
}

fn decode_segment(segment: &str) -> String {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    if decoded.contains('/') || decoded.contains('\\') {
        segment.to_string()
    } else {
        decoded.into_owned()
    }
}

/// Returns true when two URLs name the same listing
fn same_resource(a: &Url, b: &Url) -> bool {
    match (normalize_parsed(a), normalize_parsed(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
