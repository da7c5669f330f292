//! Dataset export to JSON and CSV files

use crate::extract::{DealRecord, PageResult};
use crate::CrawlerError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of the deals CSV
pub const CSV_HEADER: [&str; 8] = [
    "title",
    "price",
    "originalPrice",
    "discount",
    "store",
    "category",
    "sourceUrl",
    "timestamp",
];

/// Files written by [`export_dataset`]
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub results_json: PathBuf,
    pub deals_json: PathBuf,
    pub deals_csv: PathBuf,
}

/// Writes every export format into `out_dir`
///
/// The directory is created if missing; existing files are overwritten.
pub fn export_dataset(results: &[PageResult], out_dir: &Path) -> Result<ExportPaths, CrawlerError> {
    fs::create_dir_all(out_dir)?;

    let paths = ExportPaths {
        results_json: out_dir.join("results.json"),
        deals_json: out_dir.join("deals.json"),
        deals_csv: out_dir.join("deals.csv"),
    };

    let deals = collect_deals(results);

    write_json(&paths.results_json, results)?;
    write_json(&paths.deals_json, deals.as_slice())?;
    fs::write(&paths.deals_csv, deals_to_csv(&deals)?)?;

    tracing::info!(
        "Exported {} page(s) and {} deal(s) to {}",
        results.len(),
        deals.len(),
        out_dir.display()
    );

    Ok(paths)
}

/// All deals across the given pages, in page order
pub fn collect_deals(results: &[PageResult]) -> Vec<DealRecord> {
    results.iter().flat_map(|r| r.deals.iter().cloned()).collect()
}

/// Renders deals as CSV text with a header row
pub fn deals_to_csv(deals: &[DealRecord]) -> Result<String, CrawlerError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer.write_record(CSV_HEADER)?;

    for deal in deals {
        writer.write_record([
            deal.title.as_str(),
            deal.price.as_str(),
            deal.original_price.as_str(),
            deal.discount.as_str(),
            deal.store.as_str(),
            deal.category.as_str(),
            deal.source_url.as_str(),
            deal.timestamp.to_rfc3339().as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CrawlerError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CrawlerError> {
    let mut file = fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    Ok(())
}
