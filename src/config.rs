//! Engine configuration.
//!
//! Defaults match the production add-on; tests and the CLI override single
//! values through the `with_*` builders.

use std::time::Duration;

/// Origin every queue target must belong to.
pub const TARGET_ORIGIN: &str = "https://www.instagram.com";

/// Storage key of the persisted queue record.
pub const STORAGE_KEY: &str = "irsQueueState";

/// Hard cap on queue length and on every scan result.
pub const MAX_QUEUE_SIZE: usize = 400;

/// Consecutive non-growing collector rounds before a run ends.
pub const STALE_ROUND_LIMIT: u32 = 3;

/// Time given to the feed to render lazily-loaded tiles after a scroll.
pub const SCROLL_DELAY: Duration = Duration::from_millis(1500);

/// Sender identity accepted by the control channel when none is configured.
pub const DEFAULT_EXTENSION_ID: &str = "reel-shuffler";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub target_origin: String,
    pub storage_key: String,
    pub max_queue_size: usize,
    pub scroll_delay: Duration,
    pub stale_round_limit: u32,
    pub extension_id: String,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            target_origin: TARGET_ORIGIN.to_string(),
            storage_key: STORAGE_KEY.to_string(),
            max_queue_size: MAX_QUEUE_SIZE,
            scroll_delay: SCROLL_DELAY,
            stale_round_limit: STALE_ROUND_LIMIT,
            extension_id: DEFAULT_EXTENSION_ID.to_string(),
        }
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = origin.into();
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_max_queue_size(mut self, max: usize) -> Self {
        self.max_queue_size = max;
        self
    }

    pub fn with_scroll_delay(mut self, delay: Duration) -> Self {
        self.scroll_delay = delay;
        self
    }

    pub fn with_stale_round_limit(mut self, rounds: u32) -> Self {
        self.stale_round_limit = rounds;
        self
    }

    pub fn with_extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = id.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
