//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock clock for testing.
///
/// Lets tests control time progression explicitly, enabling deterministic
/// flush deadlines and pattern ages.
///
/// # Examples
///
/// ```
/// use logweave::infrastructure::mocks::MockClock;
/// use logweave::application::ports::Clock;
///
/// let clock = MockClock::new(1_000);
/// assert_eq!(clock.epoch_secs(), 1_000);
///
/// clock.advance_secs(60);
/// assert_eq!(clock.epoch_secs(), 1_060);
/// ```
///
/// # Thread Safety
///
/// Clones share the same underlying time value, so advancing one clone
/// advances them all.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a mock clock starting at the given epoch second.
    pub fn new(start_secs: u64) -> Self {
        Self {
            current: Arc::new(Mutex::new(Duration::from_secs(start_secs))),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut now = self
            .current
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *now += duration;
    }

    /// Advance the clock by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Advance the clock by milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Pin the clock to a specific epoch second.
    pub fn set_secs(&self, secs: u64) {
        let mut now = self
            .current
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *now = Duration::from_secs(secs);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        *self
            .current
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}
