//! Ports (interfaces) for the application layer.
//!
//! The dispatcher and analyzer are written against these traits;
//! infrastructure supplies the concrete adapters (console/file sinks,
//! system clock) and the test doubles (capture sink, mock clock).

use crate::domain::record::Record;
use crate::error::Result;
use std::fmt::Debug;
use std::time::Duration;

/// Port for a log destination.
///
/// A sink receives fully formatted records from the dispatcher, always in
/// dispatch order. Sinks are owned by their logger and called under the
/// dispatcher lock, so implementations get `&mut self` and need no
/// internal synchronization of their own.
///
/// `close` must be idempotent; `write` after `close` should fail rather
/// than panic.
pub trait Sink: Send + Debug {
    /// Deliver one record.
    ///
    /// # Errors
    /// Transient errors are surfaced to the dispatcher, which reports them
    /// on the diagnostic channel and keeps delivering to other sinks.
    fn write(&mut self, record: &Record<'_>) -> Result<()>;

    /// Push any buffered bytes to the underlying destination.
    fn flush(&mut self) -> Result<()>;

    /// Release resources. Safe to call more than once.
    fn close(&mut self);
}

/// Port for obtaining wall-clock time.
///
/// Everything time-dependent (record timestamps, flush deadlines, pattern
/// ages) goes through this trait so tests can drive time explicitly.
pub trait Clock: Send + Sync + Debug {
    /// Duration since the Unix epoch.
    fn now(&self) -> Duration;

    /// Whole seconds since the Unix epoch.
    fn epoch_secs(&self) -> i64 {
        self.now().as_secs() as i64
    }

    /// Whole milliseconds since the Unix epoch.
    fn epoch_millis(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedClock(Duration);

    impl Clock for FixedClock {
        fn now(&self) -> Duration {
            self.0
        }
    }

    #[test]
    fn test_clock_helpers_derive_from_now() {
        let clock = FixedClock(Duration::from_millis(12_345));
        assert_eq!(clock.epoch_secs(), 12);
        assert_eq!(clock.epoch_millis(), 12_345);
    }
}
