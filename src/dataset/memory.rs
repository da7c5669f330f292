//! In-memory dataset used by the HTTP service and tests

use crate::crawler::CrawlStats;
use crate::dataset::traits::{
    DatasetResult, DatasetStore, DatasetSummary, RunRecord, RunStatus,
};
use crate::extract::PageResult;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct Inner {
    items: Vec<PageResult>,
    runs: Vec<RunRecord>,
    summary: DatasetSummary,
}

/// A dataset that keeps page results in memory
///
/// Clones share the same storage, so a caller can keep one handle while the
/// sink writer owns another.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: Vec::new(),
                runs: Vec::new(),
                summary: DatasetSummary {
                    item_count: 0,
                    created_at: now,
                    modified_at: now,
                },
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copies out every stored page result
    pub fn items(&self) -> Vec<PageResult> {
        self.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore for MemoryDataset {
    fn append(&mut self, result: &PageResult) -> DatasetResult<()> {
        let mut inner = self.lock();
        inner.items.push(result.clone());
        inner.summary.item_count += 1;
        inner.summary.modified_at = Utc::now();
        Ok(())
    }

    fn summary(&self) -> DatasetResult<DatasetSummary> {
        Ok(self.lock().summary.clone())
    }

    fn results(&self) -> DatasetResult<Vec<PageResult>> {
        Ok(self.items())
    }

    fn start_run(&mut self, config_hash: &str) -> DatasetResult<i64> {
        let mut inner = self.lock();
        let id = inner.runs.len() as i64 + 1;
        inner.runs.push(RunRecord {
            id,
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            stats: None,
        });
        Ok(id)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        stats: &CrawlStats,
        status: RunStatus,
    ) -> DatasetResult<()> {
        let mut inner = self.lock();
        if let Some(run) = inner.runs.iter_mut().find(|r| r.id == run_id) {
            run.finished_at = Some(Utc::now());
            run.status = status;
            run.stats = Some(stats.clone());
        }
        Ok(())
    }

    fn runs(&self) -> DatasetResult<Vec<RunRecord>> {
        Ok(self.lock().runs.clone())
    }

    fn clear(&mut self) -> DatasetResult<()> {
        let now = Utc::now();
        let mut inner = self.lock();
        inner.items.clear();
        inner.runs.clear();
        inner.summary = DatasetSummary {
            item_count: 0,
            created_at: now,
            modified_at: now,
        };
        Ok(())
    }
}
