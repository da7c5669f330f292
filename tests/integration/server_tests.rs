//! HTTP service tests: each request runs a real crawl against a mock site

use crate::common::{html, test_config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use deal_crawler::server::{create_router, AppState};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn shop() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Shop</title></head><body>
                <div class="deal"><h2>Widget</h2><span class="price">$5</span></div>
                <a href="/deals/today">Today</a>
                <a href="/about">About</a>
                <a href="https://elsewhere.test/">Elsewhere</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deals/today"))
        .respond_with(html(
            r#"<html><head><title>Today</title></head><body>
                <div class="deal"><h2>Gadget</h2><span class="price">$9</span></div>
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

async fn post(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_basic_crawl_follows_same_domain_links() {
    let mock_server = shop().await;
    let app = create_router(AppState::new(test_config(&mock_server.uri())));

    let (status, json) = post(
        app,
        "/crawl/basic",
        serde_json::json!({ "urls": [format!("{}/", mock_server.uri())], "maxRequests": 10 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Basic crawling completed");
    assert_eq!(json["data"]["pagesCrawled"], 3);
    assert!(json["data"].get("totalDeals").is_none());

    let results = json["data"]["results"].as_array().unwrap();
    assert!(results.iter().all(|r| r["deals"].as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn test_advanced_crawl_extracts_deals() {
    let mock_server = shop().await;
    let app = create_router(AppState::new(test_config(&mock_server.uri())));

    let (status, json) = post(
        app,
        "/crawl/advanced",
        serde_json::json!({ "urls": [format!("{}/", mock_server.uri())] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagesCrawled"], 3);
    assert_eq!(json["data"]["totalDeals"], 2);
    assert_eq!(json["data"]["totalLinks"], 3);
}

#[tokio::test]
async fn test_configurable_crawl_applies_custom_config() {
    let mock_server = shop().await;
    let app = create_router(AppState::new(test_config(&mock_server.uri())));

    let (status, json) = post(
        app,
        "/crawl/configurable",
        serde_json::json!({
            "urls": [format!("{}/", mock_server.uri())],
            "maxRequests": 5,
            "customConfig": { "followPatterns": ["**/deals/**"] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Configurable crawling completed");
    assert_eq!(json["data"]["pagesCrawled"], 2);
    assert_eq!(json["data"]["totalDeals"], 2);
    assert_eq!(json["data"]["config"]["maxRequests"], 5);
    assert_eq!(json["data"]["config"]["linkStrategy"], "same-domain");
    assert_eq!(json["data"]["config"]["followPatterns"][0], "**/deals/**");
}

#[tokio::test]
async fn test_default_urls_come_from_base_config() {
    let mock_server = shop().await;
    let app = create_router(AppState::new(test_config(&format!("{}/about", mock_server.uri()))));

    let (status, json) = post(app, "/crawl/advanced", serde_json::json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagesCrawled"], 1);
    assert_eq!(json["data"]["results"][0]["title"], "About");
}
