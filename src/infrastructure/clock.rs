//! Clock adapter for wall-clock time.
//!
//! Production code uses [`SystemClock`]; tests drive time explicitly with
//! `MockClock` from `crate::infrastructure::mocks`.

use crate::application::ports::Clock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// System clock reading `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        // A system clock before the epoch only happens on badly
        // misconfigured hosts; saturate to zero rather than panic.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}
