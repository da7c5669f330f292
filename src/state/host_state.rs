use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Tracks the dispatch history of one host during a crawl
///
/// Politeness is enforced before every request is started, first attempts
/// and retries alike, so this only needs to know when the last request to
/// the host was started.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests dispatched to this host in the current crawl
    pub request_count: u32,

    /// When the last request to this host was dispatched
    pub last_dispatch: Option<Instant>,
}

impl HostState {
    /// Creates a new HostState with no dispatch history
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be dispatched to this host at `now`
    ///
    /// # Arguments
    ///
    /// * `delay` - The minimum spacing between dispatches to one host
    /// * `now` - The current time instant
    pub fn can_dispatch(&self, delay: Duration, now: Instant) -> bool {
        self.time_until_next(delay, now).is_none()
    }

    /// Records that a request to this host was dispatched
    pub fn record_dispatch(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_dispatch = Some(now);
    }

    /// Calculates the time until the next request can be dispatched
    ///
    /// Returns None if a request can be dispatched now.
    pub fn time_until_next(&self, delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < delay {
            Some(delay - elapsed)
        } else {
            None
        }
    }
}

/// Per-host politeness table
#[derive(Debug, Clone)]
pub struct HostTable {
    delay: Duration,
    hosts: HashMap<String, HostState>,
}

impl HostTable {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hosts: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true if `host` may receive a request at `now`
    pub fn ready(&self, host: &str, now: Instant) -> bool {
        if self.delay.is_zero() {
            return true;
        }
        self.hosts
            .get(host)
            .map_or(true, |state| state.can_dispatch(self.delay, now))
    }

    /// Time until `host` becomes ready, or None when it is ready now
    pub fn wait_for(&self, host: &str, now: Instant) -> Option<Duration> {
        if self.delay.is_zero() {
            return None;
        }
        self.hosts
            .get(host)
            .and_then(|state| state.time_until_next(self.delay, now))
    }

    pub fn record_dispatch(&mut self, host: &str, now: Instant) {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .record_dispatch(now);
    }

    pub fn get(&self, host: &str) -> Option<&HostState> {
        self.hosts.get(host)
    }
}

/// Politeness table shared by the scheduler and its running units
///
/// The scheduler consults it when dispatching first attempts; a unit goes
/// through [`HostGate::acquire`] before each retry, so retries are spaced
/// the same way.
#[derive(Debug, Clone)]
pub struct HostGate {
    table: Arc<Mutex<HostTable>>,
}

impl HostGate {
    pub fn new(delay: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HostTable::new(delay))),
        }
    }

    /// Locks the table; the guard must not be held across an await
    pub fn lock(&self) -> MutexGuard<'_, HostTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits until `host` is ready, then records a dispatch to it
    ///
    /// # Arguments
    ///
    /// * `host` - Host the next request goes to
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let mut table = self.lock();
                let now = Instant::now();
                match table.wait_for(host, now) {
                    None => {
                        table.record_dispatch(host, now);
                        return;
                    }
                    Some(wait) => wait,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_can_dispatch_initially() {
        let state = HostState::new();
        assert!(state.can_dispatch(DELAY, Instant::now()));
    }

    #[test]
    fn test_cannot_dispatch_too_soon() {
        let mut state = HostState::new();
        let now = Instant::now();
        state.record_dispatch(now);

        assert!(!state.can_dispatch(DELAY, now));
        assert!(!state.can_dispatch(DELAY, now + Duration::from_millis(500)));
        assert!(state.can_dispatch(DELAY, now + Duration::from_millis(1100)));
    }

    #[test]
    fn test_time_until_next() {
        let mut state = HostState::new();
        let now = Instant::now();
        assert!(state.time_until_next(DELAY, now).is_none());

        state.record_dispatch(now);
        assert_eq!(state.time_until_next(DELAY, now), Some(DELAY));
        assert_eq!(
            state.time_until_next(DELAY, now + Duration::from_millis(400)),
            Some(Duration::from_millis(600))
        );
        assert_eq!(state.request_count, 1);
    }

    #[test]
    fn test_table_tracks_hosts_independently() {
        let mut table = HostTable::new(DELAY);
        let now = Instant::now();
        table.record_dispatch("a.test", now);

        assert!(!table.ready("a.test", now));
        assert!(table.ready("b.test", now));
        assert!(table.wait_for("a.test", now).is_some());
        assert_eq!(table.get("a.test").map(|s| s.request_count), Some(1));
    }

    #[test]
    fn test_zero_delay_is_always_ready() {
        let mut table = HostTable::new(Duration::ZERO);
        let now = Instant::now();
        table.record_dispatch("a.test", now);
        assert!(table.ready("a.test", now));
        assert!(table.wait_for("a.test", now).is_none());
    }

    #[tokio::test]
    async fn test_gate_acquire_spaces_same_host() {
        let gate = HostGate::new(Duration::from_millis(100));
        let started = Instant::now();

        gate.acquire("a.test").await;
        gate.acquire("b.test").await;
        assert!(started.elapsed() < Duration::from_millis(100));

        gate.acquire("a.test").await;
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(gate.lock().get("a.test").map(|s| s.request_count), Some(2));
    }

    #[tokio::test]
    async fn test_gate_clones_share_table() {
        let gate = HostGate::new(DELAY);
        let other = gate.clone();
        gate.acquire("a.test").await;
        assert!(!other.lock().ready("a.test", Instant::now()));
    }
}
