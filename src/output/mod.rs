//! Output module for crawl summaries and dataset exports
//!
//! This module handles:
//! - Printing run statistics after a crawl
//! - Analyzing a stored dataset
//! - Exporting page results and deals as JSON and CSV

mod export;
pub mod stats;

pub use export::{collect_deals, deals_to_csv, export_dataset, ExportPaths, CSV_HEADER};
pub use stats::{print_analysis, print_run_stats, print_runs, DatasetAnalysis};

use crate::dataset::DatasetStore;
use crate::CrawlerError;

/// Loads and analyzes everything stored in a dataset
pub fn analyze_store(store: &dyn DatasetStore) -> Result<DatasetAnalysis, CrawlerError> {
    let summary = store.summary()?;
    let results = store.results()?;
    Ok(DatasetAnalysis::from_results(&results, summary))
}
