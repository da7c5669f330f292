//! End-to-end crawl runs against mock servers and scripted fetchers

use crate::common::{html, test_config, Script, ScriptedFetcher};
use deal_crawler::crawler::{Coordinator, Frontier, LiveProbe};
use deal_crawler::dataset::MemoryDataset;
use deal_crawler::url::{LinkFilter, LinkStrategy};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_extracts_only_records_with_signal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head>
                <title>Today's Deals</title>
                <meta name="description" content="Hand-picked bargains">
            </head><body>
                <div class="deal">
                    <h2>Widget</h2>
                    <span class="price">$5</span>
                </div>
                <div class="deal">
                    <p class="description">No title and no price here</p>
                </div>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/", mock_server.uri()));
    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 1);
    assert_eq!(outcome.stats.pages_succeeded, 1);
    assert_eq!(outcome.stats.total_deals, 1);

    let page = &outcome.results[0];
    assert_eq!(page.title, "Today's Deals");
    assert_eq!(page.metadata.description, "Hand-picked bargains");
    assert_eq!(page.deals.len(), 1);
    assert_eq!(page.deals[0].title, "Widget");
    assert_eq!(page.deals[0].price, "$5");
    assert_eq!(page.deals[0].source_url, page.url);
}

#[tokio::test]
async fn test_excluded_link_is_never_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body>
                <a href="{}/login/signin">Sign in</a>
                <a href="/deals/one">Deal one</a>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deals/one"))
        .respond_with(html("<html><head><title>Deal one</title></head></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login/signin"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&format!("{}/", base_url));
    config.exclude_patterns = vec!["**/login/**".to_string()];

    // The frontier itself refuses the link
    let filter = LinkFilter::new(LinkStrategy::SameDomain, &[], &config.exclude_patterns).unwrap();
    let frontier = Frontier::new(filter);
    let referrer = Url::parse(&format!("{}/", base_url)).unwrap();
    let login = Url::parse(&format!("{}/login/signin", base_url)).unwrap();
    assert!(!frontier.enqueue(&login, Some(&referrer), 1));
    assert!(frontier.is_empty());

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 2);
    assert!(outcome.results.iter().all(|r| !r.url.contains("/login/")));
    // The link is still reported as found on the page
    assert!(outcome.results.iter().any(|r| r
        .links
        .iter()
        .any(|l| l.href.ends_with("/login/signin"))));
}

#[tokio::test]
async fn test_budget_limits_first_attempts() {
    let mock_server = MockServer::start().await;
    let budget = 3u32;

    let links: String = (0..budget + 5)
        .map(|i| format!(r#"<a href="/p/{}">Page {}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!("<html><body>{}</body></html>", links)))
        .mount(&mock_server)
        .await;

    for i in 0..budget + 5 {
        Mock::given(method("GET"))
            .and(path(format!("/p/{}", i)))
            .respond_with(html("<html><body>leaf</body></html>"))
            .mount(&mock_server)
            .await;
    }

    let mut config = test_config(&format!("{}/", mock_server.uri()));
    config.crawler.max_requests_per_crawl = budget;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, u64::from(budget));
    assert_eq!(outcome.stats.requests_remaining, 0);
    assert_eq!(outcome.results.len(), budget as usize);
    assert_eq!(outcome.summary.item_count, u64::from(budget));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), budget as usize);
}

#[tokio::test]
async fn test_server_errors_retried_then_recorded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&format!("{}/flaky", mock_server.uri()));
    config.crawler.max_request_retries = 3;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .with_retry_backoff(Duration::ZERO)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 1);
    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.results[0].attempts, 4);
    assert_eq!(outcome.results[0].error.as_deref(), Some("HTTP 503"));
}

#[tokio::test]
async fn test_always_transient_attempted_max_retries_plus_one() {
    let fetcher = Arc::new(ScriptedFetcher::new(Script::AlwaysTransient));
    let mut config = test_config("https://example.test/");
    config.crawler.max_request_retries = 2;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .with_fetcher(fetcher.clone())
        .with_retry_backoff(Duration::ZERO)
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(outcome.stats.pages_attempted, 1);
    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.results.len(), 1);
    assert!(!outcome.results[0].is_success());
}

#[tokio::test]
async fn test_not_found_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/missing", mock_server.uri()));
    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .with_retry_backoff(Duration::ZERO)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.results[0].attempts, 1);
}

#[tokio::test]
async fn test_non_html_content_is_permanent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"deals": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/feed", mock_server.uri()));
    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .with_retry_backoff(Duration::ZERO)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.results[0].attempts, 1);
}

#[tokio::test]
async fn test_concurrency_limit_never_exceeded() {
    let fetcher = Arc::new(ScriptedFetcher::new(Script::Page {
        delay: Duration::from_millis(10),
    }));
    let probe = LiveProbe::default();

    let mut config = test_config("https://example.test/0");
    config.start_urls = (0..20)
        .map(|i| format!("https://example.test/{}", i))
        .collect();
    config.crawler.max_concurrency = 4;
    config.crawler.max_requests_per_crawl = 100;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .with_fetcher(fetcher.clone())
        .with_probe(probe.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 20);
    assert_eq!(outcome.stats.pages_succeeded, 20);
    assert!(probe.peak() <= 4, "probe peak was {}", probe.peak());
    assert!(fetcher.peak() <= 4, "fetch peak was {}", fetcher.peak());
    assert_eq!(probe.current(), 0);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/a">A</a>
                <a href="/a#reviews">A again</a>
                <a href="/a?utm_source=newsletter">A tracked</a>
                <a href="/">Home</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><a href="/">Home</a></body></html>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/", mock_server.uri()));
    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 2);
}

async fn redirect_site(first: &str, second: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body><a href="{}">First</a><a href="{}">Second</a></body></html>"#,
            first, second
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    mock_server
}

async fn mount_new_page(mock_server: &MockServer, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html(
            r#"<html><head><title>New</title></head><body>
                <div class="deal"><h2>Widget</h2><span class="price">$5</span></div>
            </body></html>"#,
        ))
        .expect(hits)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_redirect_claims_pending_target() {
    let mock_server = redirect_site("/old", "/new").await;
    mount_new_page(&mock_server, 1).await;

    let mut config = test_config(&format!("{}/", mock_server.uri()));
    config.crawler.max_concurrency = 1;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 2);
    assert_eq!(outcome.stats.pages_succeeded, 2);
    assert_eq!(outcome.stats.total_deals, 1);

    let old = outcome
        .results
        .iter()
        .find(|r| r.url.ends_with("/old"))
        .unwrap();
    assert_eq!(old.title, "New");
    assert!(outcome.results.iter().all(|r| !r.url.ends_with("/new")));
}

#[tokio::test]
async fn test_redirect_to_crawled_page_is_not_processed_again() {
    let mock_server = redirect_site("/new", "/old").await;
    // Once directly, once as the redirect target
    mount_new_page(&mock_server, 2).await;

    let mut config = test_config(&format!("{}/", mock_server.uri()));
    config.crawler.max_concurrency = 1;

    let outcome = Coordinator::new(config)
        .with_store(Box::new(MemoryDataset::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stats.pages_attempted, 3);
    assert_eq!(outcome.stats.total_deals, 1);
    assert_eq!(outcome.stats.pages_failed, 1);

    let old = outcome
        .results
        .iter()
        .find(|r| r.url.ends_with("/old"))
        .unwrap();
    assert!(old.deals.is_empty());
    assert!(old
        .error
        .as_deref()
        .unwrap()
        .starts_with("Redirected to already crawled"));
}
