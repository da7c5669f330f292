//! Non-blocking dataset sink
//!
//! Fetch-process units call [`DatasetSink::append`], which only pushes onto
//! an unbounded channel. A single blocking writer thread owns the store and
//! performs the physical writes, so slow I/O never stalls extraction.

use crate::crawler::CrawlStats;
use crate::dataset::traits::{DatasetError, DatasetStore, DatasetSummary, RunStatus};
use crate::extract::PageResult;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Retries after the first failed write
const MAX_WRITE_RETRIES: u32 = 3;

/// Delay before the first retry; doubled for each following one
const WRITE_BACKOFF_BASE: Duration = Duration::from_millis(50);

enum Command {
    Append(Box<PageResult>),
    CompleteRun {
        run_id: i64,
        stats: CrawlStats,
        status: RunStatus,
    },
    Finalize(oneshot::Sender<Result<DatasetSummary, DatasetError>>),
}

/// Cloneable handle to the dataset writer
#[derive(Clone)]
pub struct DatasetSink {
    tx: mpsc::UnboundedSender<Command>,
    failed: Arc<AtomicBool>,
    written: Arc<AtomicU64>,
}

impl DatasetSink {
    /// Starts the writer thread that owns `store`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(store: Box<dyn DatasetStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failed = Arc::new(AtomicBool::new(false));
        let written = Arc::new(AtomicU64::new(0));

        let writer = Writer {
            store,
            failure: None,
            failed: Arc::clone(&failed),
            written: Arc::clone(&written),
        };
        tokio::task::spawn_blocking(move || writer.run(rx));

        Self { tx, failed, written }
    }

    /// Queues a page result for writing and returns immediately
    pub fn append(&self, result: PageResult) -> Result<(), DatasetError> {
        self.tx
            .send(Command::Append(Box::new(result)))
            .map_err(|_| DatasetError::Closed)
    }

    /// Queues the final statistics of a run
    pub fn complete_run(
        &self,
        run_id: i64,
        stats: CrawlStats,
        status: RunStatus,
    ) -> Result<(), DatasetError> {
        self.tx
            .send(Command::CompleteRun {
                run_id,
                stats,
                status,
            })
            .map_err(|_| DatasetError::Closed)
    }

    /// Returns true once a write has failed beyond its retries
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Number of page results written so far
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }

    /// Drains every queued write and returns the dataset summary
    ///
    /// Surfaces an unrecoverable write failure as
    /// [`DatasetError::WriteFailed`]. The writer stops afterwards; further
    /// appends fail with [`DatasetError::Closed`].
    pub async fn finalize(&self) -> Result<DatasetSummary, DatasetError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Finalize(reply_tx))
            .map_err(|_| DatasetError::Closed)?;
        reply_rx.await.map_err(|_| DatasetError::Closed)?
    }
}

struct Writer {
    store: Box<dyn DatasetStore>,
    failure: Option<(u32, String)>,
    failed: Arc<AtomicBool>,
    written: Arc<AtomicU64>,
}

impl Writer {
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.blocking_recv() {
            match command {
                Command::Append(result) => {
                    if self.failure.is_some() {
                        tracing::error!("Dropping page result for {}: dataset failed", result.url);
                        continue;
                    }
                    let outcome = self.with_retries(|store| store.append(&result));
                    match outcome {
                        Ok(()) => {
                            self.written.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(failure) => self.latch(failure),
                    }
                }
                Command::CompleteRun {
                    run_id,
                    stats,
                    status,
                } => {
                    if let Err(failure) =
                        self.with_retries(|store| store.complete_run(run_id, &stats, status))
                    {
                        self.latch(failure);
                    }
                }
                Command::Finalize(reply) => {
                    let result = match self.failure.take() {
                        Some((attempts, reason)) => {
                            Err(DatasetError::WriteFailed { attempts, reason })
                        }
                        None => self.store.summary(),
                    };
                    let _ = reply.send(result);
                    return;
                }
            }
        }
    }

    /// Runs `op` with bounded exponential backoff
    fn with_retries<F>(&mut self, mut op: F) -> Result<(), (u32, String)>
    where
        F: FnMut(&mut dyn DatasetStore) -> Result<(), DatasetError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(self.store.as_mut()) {
                Ok(()) => return Ok(()),
                Err(e) if attempt <= MAX_WRITE_RETRIES => {
                    let delay = WRITE_BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        "Dataset write failed (attempt {}), retrying in {:?}: {}",
                        attempt,
                        delay,
                        e
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err((attempt, e.to_string())),
            }
        }
    }

    fn latch(&mut self, failure: (u32, String)) {
        tracing::error!(
            "Dataset write failed after {} attempts: {}",
            failure.0,
            failure.1
        );
        self.failed.store(true, Ordering::SeqCst);
        self.failure = Some(failure);
    }
}
