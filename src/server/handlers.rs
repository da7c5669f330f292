//! Request handlers for the crawl service.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::config::{Config, ConfigOverrides, SelectorConfig};
use crate::crawler::{CrawlOutcome, Coordinator};
use crate::dataset::MemoryDataset;
use crate::extract::PageResult;
use crate::url::{LinkFilter, LinkStrategy};

const BASIC_MAX_REQUESTS: u32 = 10;
const DEFAULT_MAX_REQUESTS: u32 = 20;

/// Body of every crawl endpoint; all fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlBody {
    pub urls: Option<Vec<String>>,
    pub max_requests: Option<u32>,
    pub custom_config: Option<ConfigOverrides>,
}

/// Body of `PUT /config`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigBody {
    pub config: ConfigOverrides,
}

/// Which crawl endpoint is being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlMode {
    Basic,
    Advanced,
    Configurable,
}

impl CrawlMode {
    fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Advanced => "Advanced",
            Self::Configurable => "Configurable",
        }
    }

    fn default_max_requests(self) -> u32 {
        match self {
            Self::Basic => BASIC_MAX_REQUESTS,
            Self::Advanced | Self::Configurable => DEFAULT_MAX_REQUESTS,
        }
    }
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message.to_string(),
        })),
    )
        .into_response()
}

/// Parses an optional JSON body; an empty body means all defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e)))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Same-domain link crawl without deal extraction.
pub async fn crawl_basic(State(state): State<AppState>, body: Bytes) -> Response {
    crawl(state, body, CrawlMode::Basic).await
}

/// Crawl with deal extraction using the base configuration.
pub async fn crawl_advanced(State(state): State<AppState>, body: Bytes) -> Response {
    crawl(state, body, CrawlMode::Advanced).await
}

/// Crawl with `customConfig` merged onto the base configuration.
pub async fn crawl_configurable(State(state): State<AppState>, body: Bytes) -> Response {
    crawl(state, body, CrawlMode::Configurable).await
}

async fn crawl(state: AppState, body: Bytes, mode: CrawlMode) -> Response {
    let body: CrawlBody = match parse_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let config = request_config(&state.config, &body, mode);
    let max_requests = config.crawler.max_requests_per_crawl;

    let mut coordinator = Coordinator::new(config.clone())
        .with_store(Box::new(MemoryDataset::new()));
    if mode == CrawlMode::Basic {
        coordinator = coordinator.with_selectors(SelectorConfig::links_only(
            LinkFilter::with_strategy(LinkStrategy::SameDomain),
        ));
    }

    match coordinator.run().await {
        Ok(outcome) => Json(crawl_response(mode, &config, max_requests, outcome)).into_response(),
        Err(e) => {
            tracing::error!("{} crawl error: {}", mode.label(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// Builds the configuration one request crawls with.
fn request_config(base: &Config, body: &CrawlBody, mode: CrawlMode) -> Config {
    let mut config = match (&body.custom_config, mode) {
        (Some(overrides), CrawlMode::Configurable) => base.merged(overrides),
        _ => base.clone(),
    };

    if let Some(urls) = &body.urls {
        config.start_urls = urls.clone();
    }
    config.crawler.max_requests_per_crawl =
        body.max_requests.unwrap_or_else(|| mode.default_max_requests());
    config.output.save_to_dataset = false;
    config
}

fn crawl_response(
    mode: CrawlMode,
    config: &Config,
    max_requests: u32,
    outcome: CrawlOutcome,
) -> serde_json::Value {
    let results: Vec<PageResult> = outcome
        .results
        .into_iter()
        .filter(PageResult::is_success)
        .collect();
    let message = format!("{} crawling completed", mode.label());

    let mut data = json!({
        "pagesCrawled": results.len(),
    });

    if mode != CrawlMode::Basic {
        data["totalDeals"] = json!(outcome.stats.total_deals);
        data["totalLinks"] = json!(outcome.stats.total_links);
    }
    if mode == CrawlMode::Configurable {
        data["config"] = json!({
            "maxRequests": max_requests,
            "linkStrategy": config.link_strategy,
            "followPatterns": config.follow_patterns,
        });
    }
    data["results"] = json!(results);

    json!({
        "success": true,
        "message": message,
        "data": data,
    })
}

/// Returns the base configuration.
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": state.config.as_ref(),
    }))
}

/// Returns the base configuration merged with the body; nothing is stored.
pub async fn put_config(State(state): State<AppState>, body: Bytes) -> Response {
    let body: ConfigBody = match parse_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let merged = state.config.merged(&body.config);
    Json(json!({
        "success": true,
        "message": "Configuration merged (not persisted in stateless mode)",
        "data": merged,
    }))
    .into_response()
}
