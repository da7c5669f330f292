//! Dataset Sink
//!
//! Append-only persistence of page results and run statistics:
//! - `DatasetStore`: the synchronous single-writer backend trait
//! - `SqliteDataset`: the on-disk store used by the CLI
//! - `MemoryDataset`: the store used by the HTTP service and tests
//! - `DatasetSink`: the non-blocking handle crawl workers append through

mod memory;
mod schema;
mod sink;
mod sqlite;
mod traits;

pub use memory::MemoryDataset;
pub use sink::DatasetSink;
pub use sqlite::SqliteDataset;
pub use traits::{
    DatasetError, DatasetResult, DatasetStore, DatasetSummary, RunRecord, RunStatus,
};

use std::path::Path;

/// Opens the dataset at `path`
pub fn open_dataset(path: &Path) -> DatasetResult<SqliteDataset> {
    SqliteDataset::open(path)
}
