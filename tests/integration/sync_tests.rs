use crate::common::*;
use listing_mirror::config::Config;
use listing_mirror::crawler::build_http_client;
use listing_mirror::{
    discover, BudgetGovernor, DiscoveredFile, FileState, Fingerprint, MemoryObjectStore,
    ObjectStore, SqliteObjectStore, SyncEngine, SyncReport,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn discovered(config: &Config) -> Vec<DiscoveredFile> {
    discover(config, BudgetGovernor::unlimited())
        .await
        .expect("root listing should be reachable")
        .files
}

async fn sync_into(
    config: &Config,
    store: Arc<dyn ObjectStore>,
    governor: BudgetGovernor,
    files: Vec<DiscoveredFile>,
) -> SyncReport {
    let client = build_http_client(&config.http).unwrap();
    SyncEngine::from_config(config, client, store, governor)
        .sync(files)
        .await
}

async fn mount_counted_file(server: &MockServer, at: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_second_sync_uploads_nothing() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["a/", "overview.txt"]).await;
    mount_listing(&server, "/pub/a/", &["a.txt"]).await;
    mount_counted_file(&server, "/pub/overview.txt", "overview contents", 2).await;
    mount_counted_file(&server, "/pub/a/a.txt", "a contents", 2).await;

    let config = test_config(&server);
    let store = Arc::new(MemoryObjectStore::new());
    let dest: Arc<dyn ObjectStore> = store.clone();

    let first = sync_into(
        &config,
        Arc::clone(&dest),
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;
    assert_eq!(first.counts(), (2, 2));
    assert_eq!(
        store.list_keys("bls-data/").unwrap(),
        vec!["bls-data/a/a.txt", "bls-data/overview.txt"]
    );
    assert_eq!(
        store.get("bls-data/a/a.txt").unwrap(),
        Some(b"a contents".to_vec())
    );

    let second = sync_into(
        &config,
        dest,
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;
    assert_eq!(second.counts(), (0, 2));
    assert_eq!(second.skipped(), 2);
    assert_eq!(store.put_count(), 2);
}

#[tokio::test]
async fn test_changed_file_is_uploaded_again() {
    let server = MockServer::start().await;
    mount_basic_tree(&server).await;

    let config = test_config(&server);
    let store = Arc::new(MemoryObjectStore::new());
    let dest: Arc<dyn ObjectStore> = store.clone();

    let files = discovered(&config).await;
    let first = sync_into(&config, Arc::clone(&dest), BudgetGovernor::unlimited(), files).await;
    assert_eq!(first.uploaded(), 2);

    server.reset().await;
    mount_listing(&server, "/pub/", &["a/", "overview.txt"]).await;
    mount_listing(&server, "/pub/a/", &["a.txt"]).await;
    mount_file(&server, "/pub/overview.txt", "overview contents").await;
    mount_file(&server, "/pub/a/a.txt", "a contents, revised").await;

    let second = sync_into(
        &config,
        dest,
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;
    assert_eq!(second.counts(), (1, 2));
    assert_eq!(
        store.fingerprint("bls-data/a/a.txt").unwrap(),
        Some(Fingerprint::of(b"a contents, revised"))
    );
}

#[tokio::test]
async fn test_download_failure_is_isolated() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["good.txt", "missing.txt"]).await;
    mount_file(&server, "/pub/good.txt", "good").await;
    mount_status(&server, "/pub/missing.txt", 404).await;

    let config = test_config(&server);
    let store = Arc::new(MemoryObjectStore::new());

    let report = sync_into(
        &config,
        store.clone(),
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;

    assert_eq!(report.counts(), (1, 2));
    assert_eq!(report.failed_downloads(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.logical_name, "missing.txt");
    assert_eq!(failure.state, FileState::FailedDownload);
    assert!(failure.error.is_some());
    assert!(!store.exists("bls-data/missing.txt").unwrap());
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["a.txt", "b.txt", "c.txt"]).await;
    mount_file(&server, "/pub/a.txt", "a").await;
    mount_file(&server, "/pub/b.txt", "b").await;
    mount_file(&server, "/pub/c.txt", "c").await;

    let config = test_config(&server);
    let store = Arc::new(MemoryObjectStore::new());
    store.fail_puts_to("bls-data/b.txt");

    let report = sync_into(
        &config,
        store.clone(),
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;

    let states: Vec<FileState> = report.outcomes.iter().map(|o| o.state).collect();
    assert_eq!(
        states,
        vec![FileState::Uploaded, FileState::FailedUpload, FileState::Uploaded]
    );
    assert_eq!(report.failed_uploads(), 1);
    assert_eq!(store.put_count(), 2);
}

#[tokio::test]
async fn test_exhausted_budget_attempts_nothing() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["a.txt", "b.txt"]).await;
    mount_counted_file(&server, "/pub/a.txt", "a", 0).await;
    mount_counted_file(&server, "/pub/b.txt", "b", 0).await;

    let config = test_config(&server);
    let files = discovered(&config).await;
    let store = Arc::new(MemoryObjectStore::new());

    let governor = BudgetGovernor::new(Duration::ZERO, Duration::ZERO);
    let report = sync_into(&config, store.clone(), governor, files).await;

    assert_eq!(report.total(), 2);
    assert_eq!(report.not_attempted(), 2);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.state == FileState::NotAttempted));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_sqlite_store_is_idempotent_across_reopen() {
    let server = MockServer::start().await;
    mount_basic_tree(&server).await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("mirror.db");
    let config = test_config(&server);

    {
        let store: Arc<dyn ObjectStore> = Arc::new(SqliteObjectStore::new(&db).unwrap());
        let report = sync_into(
            &config,
            store,
            BudgetGovernor::unlimited(),
            discovered(&config).await,
        )
        .await;
        assert_eq!(report.uploaded(), 2);
    }

    let store: Arc<dyn ObjectStore> = Arc::new(SqliteObjectStore::new(&db).unwrap());
    let report = sync_into(
        &config,
        Arc::clone(&store),
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;
    assert_eq!(report.counts(), (0, 2));
    assert_eq!(store.stats().unwrap().object_count, 2);
}

#[tokio::test]
async fn test_destination_key_uses_decoded_name() {
    let server = MockServer::start().await;
    mount_listing(&server, "/pub/", &["my file.txt"]).await;
    mount_file(&server, "/pub/my%20file.txt", "spaced").await;

    let config = test_config(&server);
    let store = Arc::new(MemoryObjectStore::new());

    let report = sync_into(
        &config,
        store.clone(),
        BudgetGovernor::unlimited(),
        discovered(&config).await,
    )
    .await;

    assert_eq!(report.uploaded(), 1);
    assert_eq!(report.outcomes[0].logical_name, "my file.txt");
    assert_eq!(
        store.get("bls-data/my file.txt").unwrap(),
        Some(b"spaced".to_vec())
    );
}
