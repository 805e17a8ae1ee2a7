//! Periodic eviction of expired sessions

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::SessionRegistry;

/// Background sweep over a [`SessionRegistry`]
pub struct SessionJanitor {
    registry: Arc<SessionRegistry>,
    period: Duration,
}

impl SessionJanitor {
    /// Janitor running at the registry's configured sweep interval
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let period = registry.config().sweep_interval;
        Self::with_period(registry, period)
    }

    /// Janitor running at a custom period
    pub fn with_period(registry: Arc<SessionRegistry>, period: Duration) -> Self {
        Self { registry, period }
    }

    /// Run one sweep, returning the number of evicted sessions
    pub fn tick(&self) -> usize {
        let evicted = self.registry.evict_expired();
        if evicted > 0 {
            info!(evicted, remaining = self.registry.len(), "Evicted expired sessions");
        } else {
            debug!(remaining = self.registry.len(), "Session sweep found nothing to evict");
        }
        evicted
    }

    /// Sweep every period until `shutdown` fires
    ///
    /// The first sweep happens one full period after spawning.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.period;
            let mut interval = tokio::time::interval_at(start, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Session janitor stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        self.tick();
                    }
                }
            }
        })
    }
}
