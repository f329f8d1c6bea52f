use crate::UrlError;
use url::Url;

/// Normalizes a URL into the identity used by the visited-set registry
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything other than HTTP(S)
/// 3. Lowercase the host
/// 4. Normalize path:
///    - Collapse repeated slashes
///    - Remove dot segments (. and ..)
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment
/// 6. Remove query string (listing servers use it only for sort order)
///
/// # Examples
///
/// ```
/// use listing_mirror::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM/pub//a/./b/?C=N;O=D").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/pub/a/b");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(url: &Url) -> Result<Url, UrlError> {
    let mut url = url.clone();

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingHost)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Joins two logical path fragments with a single forward slash
///
/// Backslashes are converted and empty components dropped, so the result is
/// stable regardless of how either side was spelled.
pub fn join_logical(parent: &str, child: &str) -> String {
    parent
        .split(is_separator)
        .chain(child.split(is_separator))
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}
