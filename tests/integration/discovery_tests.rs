use crate::common::*;
use listing_mirror::config::Config;
use listing_mirror::crawler::build_http_client;
use listing_mirror::{discover, BudgetGovernor, MirrorError, TraversalController, TraversalResult, VisitedRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_discover(config: &Config) -> TraversalResult {
    let governor = BudgetGovernor::from_config(&config.budget);
    discover(config, governor)
        .await
        .expect("root listing should be reachable")
}

#[tokio::test]
async fn test_basic_tree_with_depth_one() {
    let server = MockServer::start().await;
    mount_basic_tree(&server).await;

    let mut config = test_config(&server);
    config.traversal.max_depth = 1;

    let result = run_discover(&config).await;
    assert_eq!(result.logical_names(), vec!["a/a.txt", "overview.txt"]);
    assert_eq!(result.directories_visited, 2);
    assert!(result.failed_directories.is_empty());
    assert!(!result.budget_exhausted);

    let a = &result.files[0];
    assert_eq!(a.depth, 1);
    assert_eq!(a.source_url.as_str(), format!("{}/pub/a/a.txt", server.uri()));
}

#[tokio::test]
async fn test_basic_tree_with_depth_zero() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["a/", "overview.txt"]).await;
    mount_listing_expect(&server, "/pub/a/", &["a.txt"], 0).await;

    let mut config = test_config(&server);
    config.traversal.max_depth = 0;

    let result = run_discover(&config).await;
    assert_eq!(result.logical_names(), vec!["overview.txt"]);
    assert_eq!(result.directories_visited, 1);
    assert_eq!(result.depth_truncated, 1);
}

#[tokio::test]
async fn test_no_file_deeper_than_max_depth() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["l1/", "f0.txt"]).await;
    mount_listing(&server, "/pub/l1/", &["l2/", "f1.txt"]).await;
    mount_listing(&server, "/pub/l1/l2/", &["l3/", "f2.txt"]).await;
    mount_listing_expect(&server, "/pub/l1/l2/l3/", &["f3.txt"], 0).await;

    let mut config = test_config(&server);
    config.traversal.max_depth = 2;

    let result = run_discover(&config).await;
    assert_eq!(
        result.logical_names(),
        vec!["f0.txt", "l1/f1.txt", "l1/l2/f2.txt"]
    );
    assert!(result.files.iter().all(|f| f.depth <= 2));
    assert_eq!(result.directories_visited, 3);
}

#[tokio::test]
async fn test_cycles_visit_each_directory_once() {
    let server = MockServer::start().await;
    mount_listing_expect(&server, "/pub/", &["a/", "b/", "a/"], 1).await;
    mount_listing_expect(&server, "/pub/a/", &["/pub/b/", "../b/", "/pub/a/", "x.txt"], 1).await;
    mount_listing_expect(&server, "/pub/b/", &["../a/", "/pub/", "./", "y.txt"], 1).await;

    let mut config = test_config(&server);
    config.traversal.max_depth = 10;

    let governor = BudgetGovernor::from_config(&config.budget);
    let client = build_http_client(&config.http).unwrap();
    let controller = TraversalController::from_config(&config, client, governor).unwrap();
    let visited = Arc::new(VisitedRegistry::new());

    let result = controller.discover_with(Arc::clone(&visited)).await.unwrap();
    assert_eq!(result.logical_names(), vec!["a/x.txt", "b/y.txt"]);
    assert_eq!(result.directories_visited, 3);
    assert_eq!(visited.len(), 3);
    assert!(visited.attempts() >= 3);
}

#[tokio::test]
async fn test_same_file_linked_twice_is_reported_once() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["a/", "shared.txt", "./shared.txt"]).await;
    mount_listing(&server, "/pub/a/", &["../shared.txt", "/pub/shared.txt"]).await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["shared.txt"]);
}

#[tokio::test]
async fn test_failed_directory_does_not_stop_siblings() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["bad/", "good/", "root.txt"]).await;
    mount_listing(&server, "/pub/good/", &["g.txt"]).await;
    // One attempt plus one retry
    Mock::given(method("GET"))
        .and(path("/pub/bad/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["good/g.txt", "root.txt"]);
    assert_eq!(result.directories_visited, 2);
    assert_eq!(
        result.failed_directories,
        vec![format!("{}/pub/bad/", server.uri())]
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["gone/", "root.txt"]).await;
    Mock::given(method("GET"))
        .and(path("/pub/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["root.txt"]);
    assert_eq!(result.failed_directories.len(), 1);
}

#[tokio::test]
async fn test_non_html_listing_is_a_failed_directory() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["weird/", "root.txt"]).await;
    Mock::given(method("GET"))
        .and(path("/pub/weird/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(&["w.txt"]), "text/plain"))
        .mount(&server)
        .await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["root.txt"]);
    assert_eq!(result.failed_directories.len(), 1);
}

#[tokio::test]
async fn test_root_failure_is_an_error() {
    let server = MockServer::start().await;
    mount_status(&server, "/pub/", 503).await;

    let config = test_config(&server);
    let governor = BudgetGovernor::from_config(&config.budget);
    let err = discover(&config, governor).await.unwrap_err();
    assert!(matches!(err, MirrorError::TransientNetwork { .. }));
}

#[tokio::test]
async fn test_small_budget_returns_partial_results() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["slow1/", "slow2/", "overview.txt"]).await;
    mount_slow_listing(&server, "/pub/slow1/", &["s1.txt"], Duration::from_secs(3)).await;
    mount_slow_listing(&server, "/pub/slow2/", &["s2.txt"], Duration::from_secs(3)).await;

    let mut config = test_config(&server);
    config.budget.max_execution_ms = 700;
    config.budget.safety_margin_ms = 200;

    let started = Instant::now();
    let result = run_discover(&config).await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.budget_exhausted);
    assert_eq!(result.logical_names(), vec!["overview.txt"]);
    assert_eq!(result.directories_visited, 1);
}

#[tokio::test]
async fn test_exhausted_budget_discovers_nothing() {
    let server = MockServer::start().await;
    mount_listing_expect(&server, "/pub/", &["overview.txt"], 0).await;

    let config = test_config(&server);
    let governor = BudgetGovernor::new(Duration::ZERO, Duration::ZERO);
    let result = discover(&config, governor).await.unwrap();

    assert!(result.budget_exhausted);
    assert!(result.files.is_empty());
    assert_eq!(result.directories_visited, 0);
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pub/"))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(listing_response(&["overview.txt"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["overview.txt"]);
}

#[tokio::test]
async fn test_extensionless_links_are_directories_by_default() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["README", "sub"]).await;
    mount_listing(&server, "/pub/sub", &["/pub/sub/s.txt"]).await;
    Mock::given(method("GET"))
        .and(path("/pub/README"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("read me", "text/plain"))
        .mount(&server)
        .await;

    let result = run_discover(&test_config(&server)).await;
    assert_eq!(result.logical_names(), vec!["sub/s.txt"]);
    assert_eq!(result.failed_directories.len(), 1);
}

#[tokio::test]
async fn test_probe_reclassifies_extensionless_files() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["README", "sub"]).await;
    mount_listing(&server, "/pub/sub", &["/pub/sub/s.txt"]).await;
    Mock::given(method("HEAD"))
        .and(path("/pub/README"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/plain"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/pub/sub"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.source.probe_extensionless = true;

    let result = run_discover(&config).await;
    assert_eq!(result.logical_names(), vec!["README", "sub/s.txt"]);
    assert!(result.failed_directories.is_empty());
}
