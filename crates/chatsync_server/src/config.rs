//! Engine configuration.

use chatsync_protocol::PageLimits;
use chatsync_storage::DEFAULT_SWEEP_INTERVAL;
use std::time::Duration;

/// Thirty days, the default retention of change-log and attribution entries.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long change-log entries stay visible to incremental sync.
    pub change_log_ttl: Duration,
    /// How long origin attributions are kept (`None` keeps them forever).
    pub attribution_ttl: Option<Duration>,
    /// Page sizes for thread listings.
    pub thread_pages: PageLimits,
    /// Page sizes for message listings.
    pub message_pages: PageLimits,
    /// Whether deleting a thread leaves a change-log tombstone.
    ///
    /// Off by default: thread changes are otherwise discovered through their
    /// version, and a deleted thread simply stops appearing.
    pub record_versioned_tombstones: bool,
    /// How often an upsert retries after losing a compare-and-swap race.
    pub max_swap_attempts: u32,
    /// How often the in-memory store built by `SyncServer::new` drops
    /// expired entries.
    pub sweep_interval: Duration,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            change_log_ttl: DEFAULT_RETENTION,
            attribution_ttl: Some(DEFAULT_RETENTION),
            thread_pages: PageLimits::new(10, 28),
            message_pages: PageLimits::new(20, 50),
            record_versioned_tombstones: false,
            max_swap_attempts: 16,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Sets the change-log retention.
    pub fn with_change_log_ttl(mut self, ttl: Duration) -> Self {
        self.change_log_ttl = ttl;
        self
    }

    /// Sets the attribution retention.
    pub fn with_attribution_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.attribution_ttl = ttl;
        self
    }

    /// Sets the thread page sizes.
    pub fn with_thread_pages(mut self, limits: PageLimits) -> Self {
        self.thread_pages = limits;
        self
    }

    /// Sets the message page sizes.
    pub fn with_message_pages(mut self, limits: PageLimits) -> Self {
        self.message_pages = limits;
        self
    }

    /// Enables or disables thread deletion tombstones.
    pub fn with_versioned_tombstones(mut self, enabled: bool) -> Self {
        self.record_versioned_tombstones = enabled;
        self
    }

    /// Sets the compare-and-swap retry budget (at least one attempt).
    pub fn with_max_swap_attempts(mut self, attempts: u32) -> Self {
        self.max_swap_attempts = attempts.max(1);
        self
    }

    /// Sets the interval between sweeps of expired store entries.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
