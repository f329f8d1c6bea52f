//! HTML parser for directory listings
//!
//! This module extracts the raw `href` values of every anchor on a listing
//! page, plus the page title for logging. Resolution and classification of
//! those hrefs happen in the link classifier.

use scraper::{Html, Selector};

/// Extracted information from a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Raw href values in document order, trimmed, duplicates kept
    pub hrefs: Vec<String>,
}

/// Parses a listing page
///
/// Runs synchronously; the parsed document never outlives this call, so it
/// can be used freely from async tasks.
///
/// # Example
///
/// ```
/// use listing_mirror::crawler::parse_listing;
///
/// let html = r#"<html><head><title>Index of /pub</title></head>
///     <body><a href="a/">a/</a> <a href="overview.txt">overview.txt</a></body></html>"#;
/// let parsed = parse_listing(html);
/// assert_eq!(parsed.title.as_deref(), Some("Index of /pub"));
/// assert_eq!(parsed.hrefs, vec!["a/", "overview.txt"]);
/// ```
pub fn parse_listing(html: &str) -> ParsedListing {
    let document = Html::parse_document(html);

    ParsedListing {
        title: extract_title(&document),
        hrefs: extract_hrefs(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts every non-empty anchor href
fn extract_hrefs(document: &Html) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}
