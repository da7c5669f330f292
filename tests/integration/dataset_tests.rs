//! Crawl runs persisted to an on-disk SQLite dataset

use crate::common::{html, test_config};
use deal_crawler::crawler::run_crawl;
use deal_crawler::crawler::Coordinator;
use deal_crawler::dataset::{open_dataset, DatasetStore, RunStatus};
use deal_crawler::output::{analyze_store, export_dataset};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn deal_site() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Deals</title></head><body>
                <div class="deal">
                    <h3>Widget</h3>
                    <span class="price">$5</span>
                    <span class="store">Acme</span>
                    <img src="/img/widget.png">
                </div>
                <div class="product">
                    <h3>Gadget</h3>
                    <span class="category">Tools</span>
                </div>
                <a href="/about">About</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<html><head><title>About</title></head></html>"))
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn test_crawl_writes_sqlite_dataset() {
    let mock_server = deal_site().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("storage").join("dataset.db");

    let mut config = test_config(&format!("{}/", mock_server.uri()));
    config.output.save_to_dataset = true;
    config.output.dataset_path = db_path.to_string_lossy().into_owned();

    let outcome = run_crawl(config).await.unwrap();
    assert_eq!(outcome.stats.pages_succeeded, 2);
    assert_eq!(outcome.stats.total_deals, 2);
    assert_eq!(outcome.summary.item_count, 2);

    let store = open_dataset(&db_path).unwrap();
    assert_eq!(store.summary().unwrap().item_count, 2);
    assert_eq!(store.count_deals().unwrap(), 2);

    let runs = store.runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, outcome.run_id);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].stats.as_ref().map(|s| s.total_deals), Some(2));

    let analysis = analyze_store(&store).unwrap();
    assert_eq!(analysis.total_pages, 2);
    assert_eq!(analysis.deals_with_prices, 1);
    assert_eq!(analysis.deals_with_images, 1);
    assert_eq!(analysis.unique_stores, 1);
    assert_eq!(analysis.unique_categories, 1);

    let out_dir = dir.path().join("export");
    let paths = export_dataset(&store.results().unwrap(), &out_dir).unwrap();
    let csv = std::fs::read_to_string(paths.deals_csv).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn test_runs_append_unless_fresh() {
    let mock_server = deal_site().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("dataset.db");

    let mut config = test_config(&format!("{}/", mock_server.uri()));
    config.output.save_to_dataset = true;
    config.output.dataset_path = db_path.to_string_lossy().into_owned();

    run_crawl(config.clone()).await.unwrap();
    let second = run_crawl(config.clone()).await.unwrap();
    assert_eq!(second.summary.item_count, 4);

    let fresh = Coordinator::new(config).fresh(true).run().await.unwrap();
    assert_eq!(fresh.summary.item_count, 2);

    let store = open_dataset(&db_path).unwrap();
    assert_eq!(store.runs().unwrap().len(), 1);
}
