//! Session lifetime settings

use std::time::Duration;

/// Default session lifetime (one hour)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Default janitor period (one hour)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Settings for the session registry and janitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a session lives after creation or refresh
    pub ttl: Duration,
    /// Janitor sweep period
    pub sweep_interval: Duration,
    /// Cancel a session's live streams when it is deleted, replaced or evicted
    pub cancel_streams_on_evict: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            cancel_streams_on_evict: true,
        }
    }
}
