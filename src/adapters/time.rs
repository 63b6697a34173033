//! Monotonic time source for the control loop.
//!
//! - [`HostClock`]: wall-clock milliseconds since construction, backed by
//!   `std::time::Instant`.
//! - [`ManualClock`]: advanced explicitly; used for accelerated
//!   simulation and tests.

use std::time::{Duration, Instant};

/// Anything that can report milliseconds since boot.
pub trait Clock {
    fn uptime_ms(&self) -> u64;
}

pub struct HostClock {
    start: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Block until `deadline_ms` (uptime) has passed.
    pub fn sleep_until(&self, deadline_ms: u64) {
        let now = self.uptime_ms();
        if deadline_ms > now {
            std::thread::sleep(Duration::from_millis(deadline_ms - now));
        }
    }
}

impl Clock for HostClock {
    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    now_ms: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(ms);
        self.now_ms
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms
    }
}
