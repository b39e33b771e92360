//! Time source and sleeping for the monitor loop

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::shutdown::Shutdown;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&mut self, duration: Duration);
}

/// Wall clock whose sleeps end early once shutdown is requested
pub struct SystemClock {
    shutdown: Shutdown,
}

impl SystemClock {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&mut self, duration: Duration) {
        self.shutdown.sleep(duration);
    }
}

/// Frozen clock that records sleeps and advances by them
#[cfg(test)]
pub(crate) struct ManualClock {
    pub now: DateTime<Utc>,
    pub sleeps: Vec<Duration>,
    /// Request shutdown once this many sleeps have happened
    pub stop_after: Option<(usize, Shutdown)>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            sleeps: Vec::new(),
            stop_after: None,
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        self.now += chrono::Duration::from_std(duration).unwrap_or_default();
        if let Some((limit, shutdown)) = &self.stop_after {
            if self.sleeps.len() >= *limit {
                shutdown.request();
            }
        }
    }
}
