//! URL frontier: the pending queue plus the dedup set
//!
//! Every admitted URL is remembered by its dedup key for the whole run, so a
//! URL is enqueued at most once even when it is discovered again after it
//! was fetched. The check and the insert happen under one lock.

use crate::url::{normalize_url, strip_fragment, FilterDecision, LinkFilter};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// One unit of crawl work
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// URL to fetch, fragment removed
    pub url: Url,

    /// Normalized form used for deduplication
    pub dedup_key: String,

    /// Retries consumed so far
    pub retry_count: u32,

    /// Link distance from a seed
    pub depth: u32,

    /// Page the URL was discovered on; `None` for seeds
    pub referrer: Option<Url>,
}

impl CrawlRequest {
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// Normalized form of `url` used for deduplication
///
/// Returns `None` for URLs that cannot be normalized (non-HTTP schemes,
/// missing host).
pub fn dedup_key(url: &Url) -> Option<String> {
    normalize_url(url.as_str()).ok().map(|normalized| normalized.to_string())
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<CrawlRequest>,
    seen: HashSet<String>,
}

/// FIFO crawl frontier shared by the scheduler and every unit
#[derive(Debug)]
pub struct Frontier {
    filter: LinkFilter,
    inner: Mutex<Inner>,
}

impl Frontier {
    pub fn new(filter: LinkFilter) -> Self {
        Self {
            filter,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offers a URL to the frontier
    ///
    /// # Arguments
    ///
    /// * `url` - The discovered absolute URL
    /// * `referrer` - The page it was found on, or `None` for a seed
    /// * `depth` - Link distance of `url` from a seed
    ///
    /// # Returns
    ///
    /// `true` if the URL was admitted and queued. `false` without changing
    /// any state when the URL cannot be normalized, is rejected by the link
    /// filter, or was admitted before.
    pub fn enqueue(&self, url: &Url, referrer: Option<&Url>, depth: u32) -> bool {
        let Some(dedup_key) = dedup_key(url) else {
            tracing::debug!("Rejected {}: cannot be normalized", url);
            return false;
        };

        let decision = self.filter.check(url, referrer);
        if decision != FilterDecision::Admitted {
            tracing::debug!("Rejected {}: {:?}", url, decision);
            return false;
        }

        let mut inner = self.lock();
        if !inner.seen.insert(dedup_key.clone()) {
            tracing::trace!("Duplicate {}", url);
            return false;
        }

        inner.queue.push_back(CrawlRequest {
            url: strip_fragment(url),
            dedup_key,
            retry_count: 0,
            depth,
            referrer: referrer.cloned(),
        });
        true
    }

    /// Adds a seed URL; seeds skip the strategy and follow checks
    pub fn seed(&self, url: &Url) -> bool {
        self.enqueue(url, None, 0)
    }

    /// Claims the final URL of a redirected fetch
    ///
    /// A pending request for the same dedup key is dropped from the queue,
    /// since the caller already holds its content.
    ///
    /// # Returns
    ///
    /// `false` when the URL was already dequeued or claimed by someone else,
    /// `true` otherwise. URLs that cannot be normalized are always claimable.
    pub fn mark_seen(&self, url: &Url) -> bool {
        let Some(key) = dedup_key(url) else {
            return true;
        };

        let mut inner = self.lock();
        if inner.seen.insert(key.clone()) {
            return true;
        }
        match inner.queue.iter().position(|r| r.dedup_key == key) {
            Some(index) => {
                inner.queue.remove(index);
                tracing::debug!("Claimed pending {} through a redirect", url);
                true
            }
            None => false,
        }
    }

    /// Removes the oldest pending request
    pub fn dequeue(&self) -> Option<CrawlRequest> {
        self.lock().queue.pop_front()
    }

    /// Removes the oldest pending request accepted by `ready`
    ///
    /// Requests skipped over keep their queue position.
    pub fn dequeue_where<F>(&self, ready: F) -> Option<CrawlRequest>
    where
        F: Fn(&CrawlRequest) -> bool,
    {
        let mut inner = self.lock();
        let index = inner.queue.iter().position(ready)?;
        inner.queue.remove(index)
    }

    /// Smallest value of `wait` over the pending requests
    pub fn min_wait<F>(&self, wait: F) -> Option<Duration>
    where
        F: Fn(&CrawlRequest) -> Duration,
    {
        self.lock().queue.iter().map(wait).min()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of distinct URLs ever admitted
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn filter(&self) -> &LinkFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::LinkStrategy;
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn frontier(exclude: &[&str]) -> Frontier {
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        Frontier::new(LinkFilter::new(LinkStrategy::SameDomain, &[], &exclude).unwrap())
    }

    #[test]
    fn test_duplicate_not_admitted() {
        let frontier = frontier(&[]);
        let referrer = url("https://example.test/");

        assert!(frontier.enqueue(&url("https://example.test/a"), Some(&referrer), 1));
        assert_eq!(frontier.len(), 1);

        assert!(!frontier.enqueue(&url("https://example.test/a"), Some(&referrer), 1));
        assert!(!frontier.enqueue(&url("https://EXAMPLE.test/a/#top"), Some(&referrer), 1));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_dequeued_url_stays_known() {
        let frontier = frontier(&[]);
        let seed = url("https://example.test/");
        assert!(frontier.seed(&seed));
        assert!(frontier.dequeue().is_some());
        assert!(frontier.is_empty());

        assert!(!frontier.seed(&seed));
        assert_eq!(frontier.seen_count(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let frontier = frontier(&[]);
        let referrer = url("https://example.test/");
        for path in ["a", "b", "c"] {
            frontier.enqueue(&url(&format!("https://example.test/{}", path)), Some(&referrer), 1);
        }
        let order: Vec<String> = std::iter::from_fn(|| frontier.dequeue())
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_excluded_link_not_admitted() {
        let frontier = frontier(&["**/login/**"]);
        let referrer = url("https://example.test/");
        assert!(!frontier.enqueue(&url("https://example.test/login/signin"), Some(&referrer), 1));
        assert!(frontier.is_empty());
        assert_eq!(frontier.seen_count(), 0);
    }

    #[test]
    fn test_out_of_scope_link_not_admitted_but_seed_is() {
        let frontier = frontier(&[]);
        let referrer = url("https://example.test/");
        assert!(!frontier.enqueue(&url("https://other.test/"), Some(&referrer), 1));
        assert!(frontier.seed(&url("https://other.test/")));
    }

    #[test]
    fn test_fragment_stripped_from_fetch_url() {
        let frontier = frontier(&[]);
        frontier.seed(&url("https://example.test/page?utm_source=x#section"));
        let request = frontier.dequeue().unwrap();
        assert_eq!(request.url.as_str(), "https://example.test/page?utm_source=x");
        assert_eq!(request.dedup_key, "https://example.test/page");
        assert_eq!(request.depth, 0);
        assert!(request.referrer.is_none());
    }

    #[test]
    fn test_mark_seen() {
        let frontier = frontier(&[]);
        let referrer = url("https://example.test/");
        frontier.seed(&referrer);
        frontier.enqueue(&url("https://example.test/new"), Some(&referrer), 1);
        assert!(frontier.dequeue().is_some());

        // Unknown URL is recorded and cannot be admitted afterwards
        assert!(frontier.mark_seen(&url("https://example.test/moved")));
        assert!(!frontier.enqueue(&url("https://example.test/moved"), Some(&referrer), 1));

        // Pending URL is taken out of the queue
        assert!(frontier.mark_seen(&url("https://example.test/new/")));
        assert!(frontier.is_empty());

        // Already dequeued URL cannot be claimed again
        assert!(!frontier.mark_seen(&url("https://example.test/new")));
        assert!(!frontier.mark_seen(&url("https://example.test/")));
    }

    #[test]
    fn test_dequeue_where_keeps_order_of_skipped() {
        let frontier = frontier(&[]);
        frontier.seed(&url("https://a.test/1"));
        frontier.seed(&url("https://b.test/1"));
        frontier.seed(&url("https://a.test/2"));

        let picked = frontier.dequeue_where(|r| r.host() == "b.test").unwrap();
        assert_eq!(picked.url.as_str(), "https://b.test/1");
        assert_eq!(frontier.dequeue().unwrap().url.as_str(), "https://a.test/1");
        assert_eq!(frontier.dequeue().unwrap().url.as_str(), "https://a.test/2");
    }

    #[test]
    fn test_concurrent_enqueue_admits_once() {
        let frontier = Arc::new(frontier(&[]));
        let referrer = url("https://example.test/");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                let referrer = referrer.clone();
                std::thread::spawn(move || {
                    frontier.enqueue(&url("https://example.test/shared"), Some(&referrer), 1)
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(frontier.len(), 1);
    }
}
