use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Source of the current instant, injectable so tests can move time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when `advance` is called.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

/// Per-address "last accepted connection" bookkeeping.
pub trait RateLimitStore: Send + Sync {
    fn last_seen(&self, ip: &IpAddr) -> Option<Instant>;
    fn set_last_seen(&self, ip: IpAddr, at: Instant);
    /// Drop entries last seen more than `max_age` before `now`. Returns how many were removed.
    fn sweep(&self, now: Instant, max_age: Duration) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: DashMap<IpAddr, Instant>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn last_seen(&self, ip: &IpAddr) -> Option<Instant> {
        self.entries.get(ip).map(|entry| *entry.value())
    }

    fn set_last_seen(&self, ip: IpAddr, at: Instant) {
        self.entries.insert(ip, at);
    }

    fn sweep(&self, now: Instant, max_age: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) < max_age);
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Seen again before the window elapsed; carries the time since the last accept.
    Limited { since_last: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Accept-time throttle: one accepted connection per address per window.
///
/// A limited connection does not refresh the entry, so an address that keeps
/// hammering is let through again as soon as `window` has passed since the
/// last connection that was actually accepted.
pub struct ConnectionRateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl ConnectionRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self::with_parts(
            window,
            Arc::new(InMemoryRateLimitStore::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        window: Duration,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a fresh connection from `ip` may proceed, recording it if so.
    /// A zero window disables limiting.
    pub fn check_and_record(&self, ip: IpAddr) -> RateDecision {
        let now = self.clock.now();
        if self.window.is_zero() {
            self.store.set_last_seen(ip, now);
            return RateDecision::Allowed;
        }
        if let Some(last) = self.store.last_seen(&ip) {
            let since_last = now.saturating_duration_since(last);
            if since_last < self.window {
                return RateDecision::Limited { since_last };
            }
        }
        self.store.set_last_seen(ip, now);
        RateDecision::Allowed
    }

    /// Remove entries older than `max_age` (never less than the window, so a
    /// sweep cannot change a decision).
    pub fn cleanup_stale(&self, max_age: Duration) -> usize {
        let max_age = max_age.max(self.window);
        let removed = self.store.sweep(self.clock.now(), max_age);
        if removed > 0 {
            debug!(
                removed,
                remaining = self.store.len(),
                "Rate limiter stale cleanup"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Configuration for the background rate limiter cleanup task.
#[derive(Debug, Clone)]
pub struct RateLimitCleanupConfig {
    /// How often to run cleanup (in seconds).
    pub cleanup_interval_secs: u64,
    /// Entries not refreshed for this long are removed.
    pub max_stale_age: Duration,
}

impl Default for RateLimitCleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 60,
            max_stale_age: Duration::from_secs(600),
        }
    }
}

/// Spawn a background task that periodically sweeps stale rate limiter entries
/// until `shutdown` is cancelled.
pub fn spawn_cleanup_task(
    limiter: Arc<ConnectionRateLimiter>,
    config: RateLimitCleanupConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let interval_secs = config.cleanup_interval_secs.max(1);
    let max_stale_age = config.max_stale_age;

    info!(
        interval_secs,
        max_stale_age_secs = max_stale_age.as_secs(),
        "Rate limiter cleanup task started"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; nothing to sweep yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    limiter.cleanup_stale(max_stale_age);
                    debug!(entries = limiter.len(), "Rate limiter background cleanup completed");
                }
            }
        }
    })
}
