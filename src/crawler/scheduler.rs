//! Scheduler for running fetch-process units
//!
//! This module handles:
//! - A bounded worker pool of at most `concurrency` units in flight
//! - The global request budget (first attempts only)
//! - Per-host politeness delays, enforced at dispatch and before retries
//! - Cancellation that lets in-flight units finish
//!
//! The frontier is drained until it is empty with nothing in flight, or
//! until the budget is spent and the in-flight units have finished.

use crate::config::{Config, SelectorConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::stats::{CrawlStats, StatsCounter};
use crate::crawler::unit::{process_request, UnitContext};
use crate::dataset::DatasetSink;
use crate::extract::PageResult;
use crate::state::HostGate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Longest the dispatch loop sleeps before re-checking its state
const MAX_IDLE_WAIT: Duration = Duration::from_millis(100);

/// Limits a scheduler runs with
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub concurrency: usize,
    pub request_budget: u64,
    pub max_retries: u32,
    pub politeness_delay: Duration,
    pub retry_backoff: Duration,
    pub log_deals: Option<usize>,
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.crawler.max_concurrency.max(1) as usize,
            request_budget: u64::from(config.crawler.max_requests_per_crawl),
            max_retries: config.crawler.max_request_retries,
            politeness_delay: Duration::from_millis(config.crawler.politeness_delay_ms),
            retry_backoff: Duration::from_millis(500),
            log_deals: config
                .output
                .log_to_console
                .then_some(config.output.max_deals_to_log),
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Live count of units in flight, plus the highest value seen
#[derive(Debug, Clone, Default)]
pub struct LiveProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl LiveProbe {
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            current: Arc::clone(&self.current),
        }
    }
}

struct InFlightGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything a finished schedule produced
#[derive(Debug, Clone)]
pub struct ScheduleReport {
    pub stats: CrawlStats,
    pub results: Vec<PageResult>,
    pub cancelled: bool,

    /// The dataset sink latched a write failure during the run
    pub sink_failed: bool,
}

/// Runs fetch-process units for one crawl
///
/// A scheduler is built per run and owns no process-wide state, so
/// several runs can proceed side by side.
pub struct Scheduler {
    selectors: Arc<SelectorConfig>,
    options: SchedulerOptions,
    fetcher: Arc<dyn Fetcher>,
    sink: DatasetSink,
    cancel: Arc<AtomicBool>,
    probe: LiveProbe,
}

impl Scheduler {
    pub fn new(
        selectors: Arc<SelectorConfig>,
        options: SchedulerOptions,
        fetcher: Arc<dyn Fetcher>,
        sink: DatasetSink,
    ) -> Self {
        Self {
            selectors,
            options,
            fetcher,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
            probe: LiveProbe::default(),
        }
    }

    /// Uses an external flag to cancel the run
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Shares an existing probe instead of the scheduler's own
    pub fn with_probe(mut self, probe: LiveProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Handle for observing how many units are in flight
    pub fn probe(&self) -> LiveProbe {
        self.probe.clone()
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Crawls from `seeds` until the frontier drains or the budget is spent
    ///
    /// Unparsable seeds are skipped with a warning. Per-page failures never
    /// end the run; they are counted in the returned statistics.
    ///
    /// # Arguments
    ///
    /// * `seeds` - Start URLs; they bypass the link strategy but not the
    ///   exclude patterns
    ///
    /// # Returns
    ///
    /// A `ScheduleReport` with the run statistics and every page result in
    /// completion order
    pub async fn run(&self, seeds: &[String]) -> ScheduleReport {
        let frontier = Arc::new(Frontier::new(self.selectors.link_filter.clone()));
        for raw in seeds {
            match Url::parse(raw) {
                Ok(url) => {
                    if !frontier.seed(&url) {
                        tracing::debug!("Seed not admitted: {}", raw);
                    }
                }
                Err(e) => tracing::warn!("Skipping invalid seed '{}': {}", raw, e),
            }
        }

        let hosts = HostGate::new(self.options.politeness_delay);
        let ctx = UnitContext {
            fetcher: Arc::clone(&self.fetcher),
            selectors: Arc::clone(&self.selectors),
            frontier: Arc::clone(&frontier),
            sink: self.sink.clone(),
            hosts: hosts.clone(),
            max_retries: self.options.max_retries,
            retry_backoff: self.options.retry_backoff,
            log_deals: self.options.log_deals,
        };

        let concurrency = self.options.concurrency.max(1);
        let budget = self.options.request_budget;
        let counter = StatsCounter::default();
        let mut workers: JoinSet<PageResult> = JoinSet::new();
        let mut results = Vec::new();
        let mut dispatched: u64 = 0;
        let mut cancelled = false;
        let mut sink_failed = false;

        tracing::info!(
            "Starting crawl: {} seed(s), budget {}, concurrency {}",
            frontier.len(),
            budget,
            concurrency
        );

        loop {
            if !cancelled && self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("Crawl cancelled, waiting for {} in-flight page(s)", workers.len());
                cancelled = true;
            }
            if !sink_failed && self.sink.has_failed() {
                tracing::error!("Dataset sink failed, stopping dispatch");
                sink_failed = true;
            }
            let dispatching = !cancelled && !sink_failed;

            // Phase 1: fill free worker slots with host-ready requests
            while dispatching && workers.len() < concurrency && dispatched < budget {
                let request = {
                    let mut table = hosts.lock();
                    let now = Instant::now();
                    let request = frontier.dequeue_where(|r| table.ready(r.host(), now));
                    if let Some(request) = &request {
                        table.record_dispatch(request.host(), now);
                    }
                    request
                };
                let Some(request) = request else {
                    break;
                };

                dispatched += 1;
                counter.record_dispatch();

                let ctx = ctx.clone();
                let guard = self.probe.enter();
                workers.spawn(async move {
                    let _guard = guard;
                    process_request(&ctx, request).await
                });
            }

            // Phase 2: termination
            let more_work = dispatching && dispatched < budget && !frontier.is_empty();
            if workers.is_empty() && !more_work {
                break;
            }

            // Phase 3: wait for a unit to finish or a host to become ready
            let wake = if more_work {
                let table = hosts.lock();
                let now = Instant::now();
                let next = frontier
                    .min_wait(|r| table.wait_for(r.host(), now).unwrap_or(Duration::ZERO));
                next.unwrap_or(MAX_IDLE_WAIT).min(MAX_IDLE_WAIT)
            } else {
                MAX_IDLE_WAIT
            };

            if workers.is_empty() {
                tokio::time::sleep(wake).await;
                continue;
            }

            tokio::select! {
                joined = workers.join_next() => {
                    if let Some(joined) = joined {
                        reap(joined, &counter, &mut results);
                    }
                }
                _ = tokio::time::sleep(wake) => {}
            }
        }

        let stats = counter.snapshot(budget.saturating_sub(dispatched));
        tracing::info!(
            "Crawl finished: {} attempted, {} succeeded, {} failed, {} deals",
            stats.pages_attempted,
            stats.pages_succeeded,
            stats.pages_failed,
            stats.total_deals
        );

        ScheduleReport {
            stats,
            results,
            cancelled,
            sink_failed: sink_failed || self.sink.has_failed(),
        }
    }
}

/// Folds one joined unit into the run totals
fn reap(
    joined: Result<PageResult, tokio::task::JoinError>,
    counter: &StatsCounter,
    results: &mut Vec<PageResult>,
) {
    match joined {
        Ok(result) => {
            counter.record_result(&result);
            results.push(result);
        }
        Err(e) => {
            tracing::error!("Crawl unit ended abnormally: {}", e);
            counter.record_lost();
        }
    }
}
