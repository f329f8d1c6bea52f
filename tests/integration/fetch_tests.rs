use crate::common::*;
use listing_mirror::crawler::{build_http_client, FetchError, Fetcher, RequestGate, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fetcher(server: &MockServer, max_retries: u32) -> Fetcher {
    let config = test_config(server);
    let client = build_http_client(&config.http).unwrap();
    let policy = RetryPolicy {
        max_retries,
        backoff_factor: 0.0,
    };
    Fetcher::new(client, Arc::new(RequestGate::new(2, Duration::ZERO)), policy)
}

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/a.txt"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_file(&server, "/pub/a.txt", "payload").await;

    let fetched = fetcher(&server, 3)
        .fetch_with_retry(&url(&server, "/pub/a.txt"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(fetched.body, b"payload".to_vec());
    assert_eq!(fetched.content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_rate_limited_until_retries_run_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/a.txt"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetcher(&server, 2)
        .fetch_with_retry(&url(&server, "/pub/a.txt"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_forbidden_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/a.txt"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server, 5)
        .fetch_with_retry(&url(&server, "/pub/a.txt"), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Permanent { .. }));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/slow.txt"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = fetcher(&server, 0)
        .fetch_with_retry(&url(&server, "/pub/slow.txt"), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_listing_resolves_against_final_url() {
    let server = MockServer::start().await;
    let location = format!("{}/pub/a/", server.uri());
    Mock::given(method("GET"))
        .and(path("/pub/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", location.as_str()))
        .mount(&server)
        .await;
    mount_listing(&server, "/pub/a/", &["a.txt"]).await;

    let listing = fetcher(&server, 0)
        .fetch_listing(&url(&server, "/pub/a"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(listing.final_url, url(&server, "/pub/a/"));
    assert!(listing.html.contains("a.txt"));
}

#[tokio::test]
async fn test_probe_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/pub/README"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/plain"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/pub/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, 0);
    let content_type = fetcher
        .probe_content_type(&url(&server, "/pub/README"), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(content_type.as_deref(), Some("text/plain"));

    assert!(fetcher
        .probe_content_type(&url(&server, "/pub/missing"), TIMEOUT)
        .await
        .is_err());
}

#[tokio::test]
async fn test_gate_bounds_concurrent_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let fetcher = fetcher(&server, 0);
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..6 {
        let fetcher = fetcher.clone();
        let target = url(&server, &format!("/pub/f{}.txt", i));
        tasks.spawn(async move { fetcher.fetch_with_retry(&target, TIMEOUT).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_ok());
    }

    assert_eq!(fetcher.gate().requests_issued(), 6);
    assert!(fetcher.gate().peak_in_flight() <= 2);
}
