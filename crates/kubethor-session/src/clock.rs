//! Wall-clock abstraction

use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

/// Source of the current time for expiry decisions
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
