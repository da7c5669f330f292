use crate::extract::PageResult;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    /// First attempts dispatched; retries are not counted
    pub pages_attempted: u64,
    pub pages_succeeded: u64,
    pub pages_failed: u64,
    pub total_deals: u64,
    pub total_links: u64,

    /// Budget left when the run ended
    pub requests_remaining: u64,
}

impl CrawlStats {
    /// Fraction of attempted pages that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_attempted == 0 {
            return 0.0;
        }
        self.pages_succeeded as f64 / self.pages_attempted as f64 * 100.0
    }
}

/// Lock-free counters updated as units complete
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    deals: AtomicU64,
    links: AtomicU64,
}

impl StatsCounter {
    pub fn record_dispatch(&self) {
        self.attempted.fetch_add(1, Ordering::SeqCst);
    }

    /// Folds one finished page into the totals
    pub fn record_result(&self, result: &PageResult) {
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
            self.deals
                .fetch_add(result.deals.len() as u64, Ordering::SeqCst);
            self.links
                .fetch_add(result.links.len() as u64, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Counts a unit that ended without producing a result
    pub fn record_lost(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self, requests_remaining: u64) -> CrawlStats {
        CrawlStats {
            pages_attempted: self.attempted.load(Ordering::SeqCst),
            pages_succeeded: self.succeeded.load(Ordering::SeqCst),
            pages_failed: self.failed.load(Ordering::SeqCst),
            total_deals: self.deals.load(Ordering::SeqCst),
            total_links: self.links.load(Ordering::SeqCst),
            requests_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DealRecord, PageMetadata};

    #[test]
    fn test_counter_snapshot() {
        let counter = StatsCounter::default();
        counter.record_dispatch();
        counter.record_dispatch();

        let deal = DealRecord {
            title: "Widget".to_string(),
            ..Default::default()
        };
        counter.record_result(&PageResult::success(
            "https://example.test/",
            PageMetadata::default(),
            vec![deal],
            Vec::new(),
            1,
        ));
        counter.record_result(&PageResult::failure("https://example.test/x", 4, "HTTP 503"));

        let stats = counter.snapshot(3);
        assert_eq!(stats.pages_attempted, 2);
        assert_eq!(stats.pages_succeeded, 1);
        assert_eq!(stats.pages_failed, 1);
        assert_eq!(stats.total_deals, 1);
        assert_eq!(stats.requests_remaining, 3);
        assert!((stats.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(CrawlStats::default()).unwrap();
        assert!(json.get("pagesAttempted").is_some());
        assert!(json.get("totalDeals").is_some());
    }
}
