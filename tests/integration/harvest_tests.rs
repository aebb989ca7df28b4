//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve listing and item pages and run the
//! full discovery, harvest and emission cycle end-to-end.

use catalog_harvest::config::{parse_config, Config};
use catalog_harvest::crawler::HttpFetcher;
use catalog_harvest::dataset::fields;
use catalog_harvest::pipeline::run_harvest_with_hash;
use catalog_harvest::storage::{RunStatus, SqliteStorage, Storage};
use catalog_harvest::FailureKind;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PAGE: &str = include_str!("../fixtures/listing_page.html");
const ITEM_FULL: &str = include_str!("../fixtures/item_full.html");
const ITEM_SPARSE: &str = include_str!("../fixtures/item_sparse.html");

const ITEM_A: &str = "/49231-move-to-heaven";
const ITEM_B: &str = "/25560-flower-of-evil";
const ITEM_C: &str = "/57173-twinkling-watermelon";

/// Builds a configuration pointing at the mock server
fn create_test_config(base_url: &str, pages: u32, dir: &Path) -> Config {
    let content = format!(
        r#"
[harvester]
workers = 4
batch-size = 2
batch-pause-ms = 10
request-timeout-secs = 5

[client]
user-agent = "TestHarvester/1.0"
connect-timeout-secs = 2

[site]
base-url = "{base}"

[[listing]]
template = "{base}/shows/top?page={{page}}"
pages = {pages}

[output]
dataset-path = '{dataset}'
failure-log-path = '{failures}'
database-path = '{database}'
summary-path = '{summary}'
"#,
        base = base_url,
        pages = pages,
        dataset = dir.join("dataset.csv").display(),
        failures = dir.join("failures.csv").display(),
        database = dir.join("harvest.db").display(),
        summary = dir.join("summary.md").display(),
    );

    parse_config(&content).expect("test config is valid")
}

/// Listing page HTML linking to the given item paths
fn listing_with(hrefs: &[&str]) -> String {
    hrefs
        .iter()
        .map(|href| format!(r#"<h6 class="text-primary title"><a href="{}">Item</a></h6>"#, href))
        .collect()
}

async fn mount_listing(server: &MockServer, page: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/shows/top"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_item(server: &MockServer, item_path: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(item_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_two_records_one_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();

    // Three listing pages that together link to A, B and C
    mount_listing(&mock_server, "1", 200, LISTING_PAGE.to_string()).await;
    mount_listing(&mock_server, "2", 200, listing_with(&[ITEM_A, ITEM_B])).await;
    mount_listing(&mock_server, "3", 200, listing_with(&[ITEM_C])).await;

    mount_item(&mock_server, ITEM_A, 200, ITEM_FULL).await;
    mount_item(&mock_server, ITEM_B, 200, ITEM_SPARSE).await;
    mount_item(&mock_server, ITEM_C, 500, "").await;

    let config = create_test_config(&base_url, 3, dir.path());
    let client = Arc::new(HttpFetcher::new(&config.client).unwrap());

    let run = run_harvest_with_hash(&config, client, "e2e-hash")
        .await
        .unwrap();

    // Discovery: 3 + 2 + 1 links, 3 unique
    assert_eq!(run.summary.listing_pages_attempted, 3);
    assert_eq!(run.summary.listing_pages_failed, 0);
    assert_eq!(run.summary.urls_discovered, 6);
    assert_eq!(run.summary.frontier_size, 3);

    // Harvest: A and B become rows, C becomes the only failure
    assert_eq!(run.dataset.len(), 2);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].url, format!("{}{}", base_url, ITEM_C));
    assert_eq!(run.failures[0].kind, FailureKind::ItemFetch);
    assert_eq!(run.failures[0].reason, "HTTP 500");

    let mut names: Vec<&str> = run.dataset.records().iter().filter_map(|r| r.name()).collect();
    names.sort();
    assert_eq!(names, vec!["Move to Heaven (2021)", "Quiet Film"]);

    // Header is the union of both records' fields
    let union: BTreeSet<String> = run
        .dataset
        .records()
        .iter()
        .flat_map(|r| r.field_names().map(str::to_string))
        .collect();
    let header = run.dataset.header();
    assert_eq!(header, union.into_iter().collect::<Vec<_>>());
    for field in fields::ALL {
        assert!(header.iter().any(|h| h == field), "missing column {}", field);
    }

    // CSV on disk: header line plus two rows
    let csv = std::fs::read_to_string(dir.path().join("dataset.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(header.join(",").as_str()));
    assert_eq!(lines.count(), 2);

    let failure_log = std::fs::read_to_string(dir.path().join("failures.csv")).unwrap();
    assert_eq!(
        failure_log,
        format!("url,kind,reason\n{}{},item_fetch,HTTP 500\n", base_url, ITEM_C)
    );

    // Database run is completed and holds the same rows
    let storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let stored_run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(stored_run.status, RunStatus::Completed);
    assert_eq!(stored_run.config_hash, "e2e-hash");
    assert_eq!(storage.load_dataset(stored_run.id).unwrap().header(), header);
    assert_eq!(storage.count_records(stored_run.id).unwrap(), 2);

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("- **Records**: 2"));
    assert!(summary.contains("| item_fetch | 1 |"));
}

#[tokio::test]
async fn test_failed_listing_page_does_not_stop_discovery() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, "1", 200, listing_with(&[ITEM_A])).await;
    mount_listing(&mock_server, "2", 503, String::new()).await;
    mount_listing(&mock_server, "3", 200, listing_with(&[ITEM_B])).await;

    mount_item(&mock_server, ITEM_A, 200, ITEM_FULL).await;
    mount_item(&mock_server, ITEM_B, 200, ITEM_SPARSE).await;

    let config = create_test_config(&base_url, 3, dir.path());
    let client = Arc::new(HttpFetcher::new(&config.client).unwrap());

    let run = run_harvest_with_hash(&config, client, "hash").await.unwrap();

    assert_eq!(run.summary.listing_pages_failed, 1);
    assert_eq!(run.dataset.len(), 2);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].kind, FailureKind::ListingFetch);
    assert_eq!(
        run.failures[0].url,
        format!("{}/shows/top?page=2", base_url)
    );
}

#[tokio::test]
async fn test_item_without_title_is_extraction_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = tempfile::tempdir().unwrap();

    mount_listing(&mock_server, "1", 200, listing_with(&[ITEM_A, ITEM_B])).await;
    mount_item(&mock_server, ITEM_A, 200, ITEM_FULL).await;
    mount_item(
        &mock_server,
        ITEM_B,
        200,
        "<html><body><p>Removed</p></body></html>",
    )
    .await;

    let config = create_test_config(&base_url, 1, dir.path());
    let client = Arc::new(HttpFetcher::new(&config.client).unwrap());

    let run = run_harvest_with_hash(&config, client, "hash").await.unwrap();

    assert_eq!(run.dataset.len(), 1);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].kind, FailureKind::ItemExtraction);
    assert_eq!(run.summary.records + run.failures.len() as u64, 2);
}
