//! Log records and call-site metadata.
//!
//! A [`Record`] is the borrowed view the dispatcher hands to each sink:
//! the severity, the capture-time timestamp, the formatted payload, and
//! optional call-site metadata.

use crate::domain::level::Level;
use std::sync::atomic::{AtomicU64, Ordering};

/// Immutable call-site metadata attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Capture time, seconds since the Unix epoch. Zero means "not yet
    /// stamped"; the dispatcher fills it from its clock.
    pub timestamp: i64,
    /// Process-local id of the emitting thread
    pub thread_id: u64,
    /// Source file of the call site
    pub file: String,
    /// Source line of the call site
    pub line: u32,
    /// Enclosing function or module path of the call site
    pub function: String,
}

impl RecordMetadata {
    /// Build metadata for a call site. The timestamp is left at zero and
    /// stamped by the dispatcher; the thread id is assigned from the
    /// calling thread.
    pub fn capture(file: &str, line: u32, function: &str) -> Self {
        Self {
            timestamp: 0,
            thread_id: current_thread_id(),
            file: file.to_string(),
            line,
            function: function.to_string(),
        }
    }
}

/// A single log record as delivered to a sink.
///
/// Borrowed: the dispatcher formats the payload once and lends it to every
/// sink in registration order.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Severity of the record
    pub level: Level,
    /// Capture time, seconds since the Unix epoch
    pub timestamp: i64,
    /// Formatted message payload (no trailing newline)
    pub message: &'a str,
    /// Call-site metadata, present when metadata capture is enabled
    pub metadata: Option<&'a RecordMetadata>,
}

/// Process-local id of the current thread.
///
/// Ids are dense small integers assigned on first use, which keeps them
/// readable in log output across long process lifetimes.
pub fn current_thread_id() -> u64 {
    static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
    }
    THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_fills_call_site() {
        let meta = RecordMetadata::capture("src/main.rs", 42, "app::start");
        assert_eq!(meta.timestamp, 0);
        assert_eq!(meta.file, "src/main.rs");
        assert_eq!(meta.line, 42);
        assert_eq!(meta.function, "app::start");
        assert!(meta.thread_id > 0);
    }

    #[test]
    fn test_thread_id_is_stable_per_thread() {
        let a = current_thread_id();
        let b = current_thread_id();
        assert_eq!(a, b);
    }

    #[test]
    fn test_thread_ids_differ_across_threads() {
        let main_id = current_thread_id();
        let other_id = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(main_id, other_id);
    }

    #[test]
    fn test_record_borrows_payload() {
        let meta = RecordMetadata::capture("lib.rs", 7, "tests");
        let record = Record {
            level: Level::Warn,
            timestamp: 1_700_000_000,
            message: "disk nearly full",
            metadata: Some(&meta),
        };
        assert_eq!(record.level, Level::Warn);
        assert_eq!(record.message, "disk nearly full");
        assert_eq!(record.metadata.unwrap().line, 7);
    }
}
