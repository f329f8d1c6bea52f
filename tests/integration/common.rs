//! Shared fixtures: a mock listing server and a fast test configuration

use listing_mirror::config::{parse_config, Config};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Browser-style identity without commas, so header matchers compare it whole
pub const TEST_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

/// Renders an Apache-style index page linking to `hrefs`
pub fn html(hrefs: &[&str]) -> String {
    let mut page = String::from(
        "<html><head><title>Index</title></head><body><pre>\n\
         <a href=\"?C=N;O=D\">Name</a> <a href=\"?C=M;O=A\">Last modified</a>\n\
         <a href=\"../\">Parent Directory</a>\n",
    );
    for href in hrefs {
        page.push_str(&format!("<a href=\"{0}\">{0}</a>\n", href));
    }
    page.push_str("</pre></body></html>");
    page
}

pub fn listing_response(hrefs: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(html(hrefs), "text/html")
}

/// Serves a listing at `at`
pub async fn mount_listing(server: &MockServer, at: &str, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(listing_response(hrefs))
        .mount(server)
        .await;
}

/// Serves a listing at `at` and fails the test unless it is fetched exactly `times` times
pub async fn mount_listing_expect(server: &MockServer, at: &str, hrefs: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(listing_response(hrefs))
        .expect(times)
        .mount(server)
        .await;
}

/// Serves a listing that only answers after `delay`
pub async fn mount_slow_listing(server: &MockServer, at: &str, hrefs: &[&str], delay: Duration) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(listing_response(hrefs).set_delay(delay))
        .mount(server)
        .await;
}

/// Serves a plain-text file at `at`
pub async fn mount_file(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
        .mount(server)
        .await;
}

/// Answers every request to `at` with `status`
pub async fn mount_status(server: &MockServer, at: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Configuration rooted at `<server>/pub/` with no delays and one retry
pub fn test_config(server: &MockServer) -> Config {
    let toml = format!(
        r#"
[source]
base-url = "{}/pub"

[traversal]
max-depth = 3
max-concurrency = 3
request-delay-ms = 0

[sync]
destination-prefix = "bls-data/"
concurrency = 2

[http]
user-agent = "{}"
timeout-secs = 5
download-timeout-secs = 5
max-retries = 1
backoff-factor = 0.0

[output]
database-path = ":memory:"
"#,
        server.uri(),
        TEST_USER_AGENT
    );

    parse_config(&toml).expect("test configuration should be valid")
}

/// The concrete two-level tree: `/pub/` holds `a/` and `overview.txt`, `a/` holds `a.txt`
pub async fn mount_basic_tree(server: &MockServer) {
    mount_listing(server, "/pub/", &["a/", "overview.txt"]).await;
    mount_listing(server, "/pub/a/", &["a.txt"]).await;
    mount_file(server, "/pub/overview.txt", "overview contents").await;
    mount_file(server, "/pub/a/a.txt", "a contents").await;
}
