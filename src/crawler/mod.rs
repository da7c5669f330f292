//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The URL frontier with its dedup set
//! - HTTP fetching with transient/permanent error classification
//! - The fetch-process unit run once per URL
//! - Request scheduling, budgets and politeness
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod scheduler;
mod stats;
mod unit;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use fetcher::{
    build_http_client, classify_request_error, classify_status, FetchError, FetchedPage,
    Fetcher, HttpFetcher,
};
pub use frontier::{dedup_key, CrawlRequest, Frontier};
pub use scheduler::{LiveProbe, ScheduleReport, Scheduler, SchedulerOptions};
pub use stats::CrawlStats;
pub use unit::{process_request, UnitContext};

use crate::config::Config;
use crate::CrawlerError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and build the selector snapshot
/// 2. Open the dataset and record the run
/// 3. Build the HTTP client
/// 4. Schedule and fetch pages, extracting deals and following links
/// 5. Finalize the dataset and return the run statistics
pub async fn crawl(config: Config) -> Result<CrawlOutcome, CrawlerError> {
    run_crawl(config).await
}
