//! Mock sink that captures records for testing.

use crate::application::ports::Sink;
use crate::domain::level::Level;
use crate::domain::record::{Record, RecordMetadata};
use crate::error::{Error, Result};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Owned copy of a delivered record.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedRecord {
    /// Severity the record was delivered with
    pub level: Level,
    /// Capture-time timestamp
    pub timestamp: i64,
    /// Formatted payload
    pub message: String,
    /// Call-site metadata, when the dispatcher attached it
    pub metadata: Option<RecordMetadata>,
}

/// Sink test double that records every delivery.
///
/// Clones share the captured list, so a clone can be handed to the logger
/// while the test keeps the original for assertions. `fail_writes` turns
/// it into a permanently failing sink for error-path tests.
#[derive(Debug, Clone)]
pub struct MockCaptureSink {
    shared: Arc<CaptureShared>,
}

#[derive(Debug)]
struct CaptureShared {
    captured: Mutex<Vec<CapturedRecord>>,
    flushes: AtomicU64,
    closed: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockCaptureSink {
    /// Create an empty capture sink.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(CaptureShared {
                captured: Mutex::new(Vec::new()),
                flushes: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn fail_writes(self) -> Self {
        self.shared.fail_writes.store(true, Ordering::Relaxed);
        self
    }

    /// All captured records, in delivery order.
    pub fn captured(&self) -> Vec<CapturedRecord> {
        self.shared
            .captured
            .lock()
            .expect("MockCaptureSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Number of captured records.
    pub fn count(&self) -> usize {
        self.shared
            .captured
            .lock()
            .expect("MockCaptureSink mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }

    /// Number of flushes requested.
    pub fn flushes(&self) -> u64 {
        self.shared.flushes.load(Ordering::Relaxed)
    }

    /// Whether the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Relaxed)
    }

    /// Drop all captured records.
    pub fn clear(&self) {
        self.shared
            .captured
            .lock()
            .expect("MockCaptureSink mutex poisoned - a test thread panicked while holding the lock")
            .clear();
    }
}

impl Default for MockCaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MockCaptureSink {
    fn write(&mut self, record: &Record<'_>) -> Result<()> {
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "mock sink configured to fail",
            )));
        }
        self.shared
            .captured
            .lock()
            .expect("MockCaptureSink mutex poisoned - a test thread panicked while holding the lock")
            .push(CapturedRecord {
                level: record.level,
                timestamp: record.timestamp,
                message: record.message.to_string(),
                metadata: record.metadata.cloned(),
            });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.shared.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) {
        self.shared.closed.store(true, Ordering::Relaxed);
    }
}
