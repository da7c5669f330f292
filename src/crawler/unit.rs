//! Fetch-process unit
//!
//! The per-URL lifecycle: fetch, parse, extract, offer outbound links to the
//! frontier and hand exactly one [`PageResult`] to the dataset sink. Every
//! failure stays local to the unit and becomes a failed page result.

use crate::config::SelectorConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::frontier::{dedup_key, CrawlRequest, Frontier};
use crate::dataset::DatasetSink;
use crate::extract::{extract_page, PageResult};
use crate::state::HostGate;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Shared collaborators of every unit in a run
#[derive(Clone)]
pub struct UnitContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub selectors: Arc<SelectorConfig>,
    pub frontier: Arc<Frontier>,
    pub sink: DatasetSink,

    /// Politeness gate shared with the scheduler
    pub hosts: HostGate,

    /// Retries allowed after the first attempt
    pub max_retries: u32,

    /// Pause before each retry
    pub retry_backoff: Duration,

    /// Number of deals per page to log, when console logging is on
    pub log_deals: Option<usize>,
}

/// Processes one crawl request to completion
///
/// Transient fetch errors are retried in place with the same request, so a
/// retry never goes back through the frontier. Each retry waits for the
/// backoff and then for the host's politeness delay.
///
/// # Arguments
///
/// * `ctx` - Collaborators shared by every unit of the run
/// * `request` - The dequeued request; its host was already cleared for the
///   first attempt by the scheduler
///
/// # Returns
///
/// The page result, the same one appended to the sink
pub async fn process_request(ctx: &UnitContext, mut request: CrawlRequest) -> PageResult {
    tracing::info!("Crawling: {}", request.url);

    let fetched = loop {
        match ctx.fetcher.fetch(&request.url).await {
            Ok(page) => break Ok(page),
            Err(e) if e.is_transient() && request.retry_count < ctx.max_retries => {
                request.retry_count += 1;
                tracing::warn!(
                    "Retrying {} ({}/{}): {}",
                    request.url,
                    request.retry_count,
                    ctx.max_retries,
                    e.reason()
                );
                if !ctx.retry_backoff.is_zero() {
                    tokio::time::sleep(ctx.retry_backoff).await;
                }
                ctx.hosts.acquire(request.host()).await;
            }
            Err(e) => break Err(e),
        }
    };

    let attempts = request.retry_count + 1;
    let result = match fetched {
        Ok(page) => handle_page(ctx, &request, &page, attempts),
        Err(e) => handle_failure(&request, &e, attempts),
    };

    if let Err(e) = ctx.sink.append(result.clone()) {
        tracing::error!("Could not queue result for {}: {}", request.url, e);
    }

    result
}

/// Parses and extracts a fetched page
///
/// Kept synchronous: the parsed document is not `Send` and must be dropped
/// before the unit awaits again. A page reached through a redirect is only
/// processed when its final URL was not crawled by another unit.
fn handle_page(
    ctx: &UnitContext,
    request: &CrawlRequest,
    page: &FetchedPage,
    attempts: u32,
) -> PageResult {
    if is_redirected(request, &page.url) && !ctx.frontier.mark_seen(&page.url) {
        tracing::info!(
            "Skipping {}: redirected to already crawled {}",
            request.url,
            page.url
        );
        return PageResult::failure(
            request.url.as_str(),
            attempts,
            format!("Redirected to already crawled {}", page.url),
        );
    }

    let document = Html::parse_document(&page.body);
    let extracted = extract_page(&document, &ctx.selectors, &page.url);

    let mut admitted = 0;
    for link in &extracted.outbound {
        if ctx.frontier.enqueue(link, Some(&page.url), request.depth + 1) {
            admitted += 1;
        }
    }

    tracing::debug!(
        "{}: {} deals, {} links, {} enqueued",
        request.url,
        extracted.deals.len(),
        extracted.links.len(),
        admitted
    );

    if let Some(limit) = ctx.log_deals {
        for deal in extracted.deals.iter().take(limit) {
            tracing::info!(
                "Deal: {} | {} | {}",
                deal.title,
                deal.price,
                if deal.store.is_empty() { "-" } else { deal.store.as_str() }
            );
        }
    }

    PageResult::success(
        request.url.as_str(),
        extracted.metadata,
        extracted.deals,
        extracted.links,
        attempts,
    )
}

/// True when `final_url` has a different dedup key than the request
fn is_redirected(request: &CrawlRequest, final_url: &Url) -> bool {
    final_url != &request.url
        && dedup_key(final_url).map_or(false, |key| key != request.dedup_key)
}

fn handle_failure(request: &CrawlRequest, error: &FetchError, attempts: u32) -> PageResult {
    tracing::error!(
        "Failed {} after {} attempt(s): {}",
        request.url,
        attempts,
        error.reason()
    );
    PageResult::failure(request.url.as_str(), attempts, error.reason())
}
