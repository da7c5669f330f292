//! Crawler coordinator - one crawl run from configuration to summary
//!
//! This module wires the pieces of a run together:
//! - Validating the configuration and building the selector snapshot
//! - Opening the dataset and recording the run
//! - Building the HTTP fetcher
//! - Running the scheduler and finalizing the dataset sink

use crate::config::{hash_content, validate, Config, SelectorConfig};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::scheduler::{LiveProbe, Scheduler, SchedulerOptions};
use crate::crawler::stats::CrawlStats;
use crate::dataset::{
    DatasetSink, DatasetStore, DatasetSummary, MemoryDataset, RunStatus, SqliteDataset,
};
use crate::extract::PageResult;
use crate::CrawlerError;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// What a finished crawl run hands back to its caller
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub run_id: i64,
    pub stats: CrawlStats,
    pub summary: DatasetSummary,

    /// Page results of this run, in completion order
    pub results: Vec<PageResult>,

    pub cancelled: bool,
}

/// Builder for a single crawl run
///
/// Collaborators left unset are derived from the configuration: an
/// [`HttpFetcher`] for transport, and a [`SqliteDataset`] at the configured
/// path (or a [`MemoryDataset`] when `save-to-dataset` is off).
pub struct Coordinator {
    config: Config,
    store: Option<Box<dyn DatasetStore>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    selectors: Option<SelectorConfig>,
    cancel: Arc<AtomicBool>,
    probe: Option<LiveProbe>,
    config_hash: Option<String>,
    retry_backoff: Option<Duration>,
    fresh: bool,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            fetcher: None,
            selectors: None,
            cancel: Arc::new(AtomicBool::new(false)),
            probe: None,
            config_hash: None,
            retry_backoff: None,
            fresh: false,
        }
    }

    /// Writes results to `store` instead of the configured dataset
    pub fn with_store(mut self, store: Box<dyn DatasetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Overrides the selector snapshot built from the configuration
    pub fn with_selectors(mut self, selectors: SelectorConfig) -> Self {
        self.selectors = Some(selectors);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reports in-flight counts of the run through `probe`
    pub fn with_probe(mut self, probe: LiveProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Hash recorded with the run; defaults to a hash of the config itself
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Clears the dataset before the run starts
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Runs the crawl to completion
    ///
    /// Per-page failures only show up in the statistics. An unrecoverable
    /// dataset write failure is returned as an error after the in-flight
    /// pages have drained.
    pub async fn run(self) -> Result<CrawlOutcome, CrawlerError> {
        let Coordinator {
            config,
            store,
            fetcher,
            selectors,
            cancel,
            probe,
            config_hash,
            retry_backoff,
            fresh,
        } = self;

        validate(&config)?;

        let selectors = match selectors {
            Some(selectors) => selectors,
            None => config.selector_config()?,
        };

        let fetcher: Arc<dyn Fetcher> = match fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(
                &config.user_agent,
                Duration::from_secs(config.crawler.request_timeout_secs),
            )?),
        };

        let mut store = match store {
            Some(store) => store,
            None => default_store(&config)?,
        };

        if fresh {
            tracing::info!("Clearing dataset before crawl");
            store.clear()?;
        }

        let config_hash = match config_hash {
            Some(hash) => hash,
            None => hash_content(&serde_json::to_string(&config)?),
        };
        let run_id = store.start_run(&config_hash)?;
        tracing::info!("Starting crawl run {}", run_id);

        let mut options = SchedulerOptions::from_config(&config);
        if let Some(backoff) = retry_backoff {
            options.retry_backoff = backoff;
        }

        let sink = DatasetSink::spawn(store);
        let mut scheduler = Scheduler::new(Arc::new(selectors), options, fetcher, sink.clone())
            .with_cancel(cancel);
        if let Some(probe) = probe {
            scheduler = scheduler.with_probe(probe);
        }

        let report = scheduler.run(&config.start_urls).await;

        let status = if report.sink_failed {
            RunStatus::Failed
        } else if report.cancelled {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        sink.complete_run(run_id, report.stats.clone(), status)?;

        let summary = sink.finalize().await?;
        tracing::info!(
            "Run {} {}: {} item(s) in dataset",
            run_id,
            status.to_db_string(),
            summary.item_count
        );

        Ok(CrawlOutcome {
            run_id,
            stats: report.stats,
            summary,
            results: report.results,
            cancelled: report.cancelled,
        })
    }
}

fn default_store(config: &Config) -> Result<Box<dyn DatasetStore>, CrawlerError> {
    if config.output.save_to_dataset {
        let path = Path::new(&config.output.dataset_path);
        tracing::debug!("Opening dataset at {}", path.display());
        Ok(Box::new(SqliteDataset::open(path)?))
    } else {
        Ok(Box::new(MemoryDataset::new()))
    }
}

/// Runs a crawl with every collaborator derived from `config`
pub async fn run_crawl(config: Config) -> Result<CrawlOutcome, CrawlerError> {
    Coordinator::new(config).run().await
}
