//! Statistics generation from a crawl dataset
//!
//! This module provides functionality for analyzing stored page results and
//! displaying run and dataset statistics.

use crate::crawler::CrawlStats;
use crate::dataset::{DatasetSummary, RunRecord};
use crate::extract::{DealRecord, PageResult};
use serde::Serialize;
use std::collections::BTreeSet;

/// Number of sample deals kept in an analysis
const SAMPLE_DEALS: usize = 5;

/// Summary of everything stored in a dataset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAnalysis {
    pub summary: DatasetSummary,

    /// Number of stored page results
    pub total_pages: u64,

    /// Pages whose fetch failed
    pub failed_pages: u64,

    pub total_deals: u64,
    pub deals_with_prices: u64,
    pub deals_with_images: u64,
    pub unique_stores: u64,
    pub unique_categories: u64,

    /// The first few deals in storage order
    pub sample_deals: Vec<DealRecord>,
}

impl DatasetAnalysis {
    /// Analyzes a set of page results
    pub fn from_results(results: &[PageResult], summary: DatasetSummary) -> Self {
        let deals: Vec<&DealRecord> = results.iter().flat_map(|r| r.deals.iter()).collect();

        let stores: BTreeSet<&str> = deals
            .iter()
            .map(|d| d.store.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        let categories: BTreeSet<&str> = deals
            .iter()
            .map(|d| d.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            summary,
            total_pages: results.len() as u64,
            failed_pages: results.iter().filter(|r| !r.is_success()).count() as u64,
            total_deals: deals.len() as u64,
            deals_with_prices: deals.iter().filter(|d| !d.price.is_empty()).count() as u64,
            deals_with_images: deals.iter().filter(|d| !d.image.is_empty()).count() as u64,
            unique_stores: stores.len() as u64,
            unique_categories: categories.len() as u64,
            sample_deals: deals.into_iter().take(SAMPLE_DEALS).cloned().collect(),
        }
    }
}

/// Prints the statistics of a finished run
pub fn print_run_stats(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("  Pages attempted: {}", stats.pages_attempted);
    println!("  Pages succeeded: {}", stats.pages_succeeded);
    println!("  Pages failed: {}", stats.pages_failed);
    println!("  Deals extracted: {}", stats.total_deals);
    println!("  Links found: {}", stats.total_links);
    println!("  Requests remaining: {}", stats.requests_remaining);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        stats.success_rate(),
        stats.pages_succeeded,
        stats.pages_attempted
    );
}

/// Prints a dataset analysis to stdout
pub fn print_analysis(analysis: &DatasetAnalysis) {
    println!("=== Dataset Analysis ===\n");

    println!("Dataset:");
    println!("  Items: {}", analysis.summary.item_count);
    println!("  Created: {}", analysis.summary.created_at.to_rfc3339());
    println!("  Modified: {}", analysis.summary.modified_at.to_rfc3339());
    println!();

    println!("Overview:");
    println!("  Total pages: {}", analysis.total_pages);
    println!("  Failed pages: {}", analysis.failed_pages);
    println!("  Total deals: {}", analysis.total_deals);
    println!("  Deals with prices: {}", analysis.deals_with_prices);
    println!("  Deals with images: {}", analysis.deals_with_images);
    println!("  Unique stores: {}", analysis.unique_stores);
    println!("  Unique categories: {}", analysis.unique_categories);
    println!();

    if !analysis.sample_deals.is_empty() {
        println!("Sample Deals:");
        for (i, deal) in analysis.sample_deals.iter().enumerate() {
            println!("  {}. {}", i + 1, display_or_dash(&deal.title));
            println!("     Price: {}", display_or_dash(&deal.price));
            println!("     Store: {}", display_or_dash(&deal.store));
            println!("     Source: {}", deal.source_url);
        }
        println!();
    }
}

/// Prints the recorded runs of a dataset, oldest first
pub fn print_runs(runs: &[RunRecord]) {
    if runs.is_empty() {
        println!("No crawl runs recorded");
        return;
    }

    println!("Runs ({}):", runs.len());
    for run in runs {
        let finished = run
            .finished_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let attempted = run.stats.as_ref().map_or(0, |s| s.pages_attempted);
        println!(
            "  #{} {} started {} finished {} ({} pages, config {})",
            run.id,
            run.status.to_db_string(),
            run.started_at.to_rfc3339(),
            finished,
            attempted,
            &run.config_hash[..run.config_hash.len().min(12)]
        );
    }
    println!();
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
