//! Dataset traits and error types

use crate::crawler::CrawlStats;
use crate::extract::PageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during dataset operations
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset writer is no longer running")]
    Closed,

    #[error("Dataset write failed after {attempts} attempts: {reason}")]
    WriteFailed { attempts: u32, reason: String },
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Item count and timestamps of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub item_count: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One crawl run recorded in the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub status: RunStatus,
    pub stats: Option<CrawlStats>,
}

/// Trait for dataset backends
///
/// A store has a single writer: the [`DatasetSink`](super::DatasetSink)
/// writer task owns it for the duration of a crawl. Each `append` must be
/// atomic, so no partially written page result is ever visible.
pub trait DatasetStore: Send {
    /// Appends one page result with its deals and links
    fn append(&mut self, result: &PageResult) -> DatasetResult<()>;

    /// Returns the item count and timestamps
    fn summary(&self) -> DatasetResult<DatasetSummary>;

    /// Loads every stored page result in insertion order
    fn results(&self) -> DatasetResult<Vec<PageResult>>;

    /// Records the start of a crawl run and returns its ID
    fn start_run(&mut self, config_hash: &str) -> DatasetResult<i64>;

    /// Records the end of a crawl run with its final statistics
    fn complete_run(
        &mut self,
        run_id: i64,
        stats: &CrawlStats,
        status: RunStatus,
    ) -> DatasetResult<()>;

    /// Returns every recorded run, oldest first
    fn runs(&self) -> DatasetResult<Vec<RunRecord>>;

    /// Removes all items and runs
    fn clear(&mut self) -> DatasetResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let parsed = RunStatus::from_db_string(status.to_db_string());
            assert_eq!(Some(*status), parsed);
        }
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
