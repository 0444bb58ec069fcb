//! Observability counters for the dispatcher and the analyzer.
//!
//! All counters use atomic operations behind a cloneable handle, so they
//! can be read at any time without touching the dispatcher or analyzer
//! locks. They are strictly observational: no decision path consults them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing dispatcher activity.
#[derive(Debug, Clone, Default)]
pub struct DispatchMetrics {
    inner: Arc<DispatchInner>,
}

#[derive(Debug, Default)]
struct DispatchInner {
    /// Records delivered (or staged) after passing the level gate
    records_dispatched: AtomicU64,
    /// Records rejected by the level gate
    records_filtered: AtomicU64,
    /// Records encoded into the async staging buffer
    records_staged: AtomicU64,
    /// Drain passes over the staging buffer
    drains: AtomicU64,
    /// Individual sink write/flush failures
    sink_errors: AtomicU64,
}

impl DispatchMetrics {
    /// Create a zeroed metrics handle.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_dispatched(&self) {
        self.inner.records_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self) {
        self.inner.records_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_staged(&self) {
        self.inner.records_staged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drain(&self) {
        self.inner.drains.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_error(&self) {
        self.inner.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records delivered (or staged) after passing the level gate.
    pub fn records_dispatched(&self) -> u64 {
        self.inner.records_dispatched.load(Ordering::Relaxed)
    }

    /// Records rejected by the level gate.
    pub fn records_filtered(&self) -> u64 {
        self.inner.records_filtered.load(Ordering::Relaxed)
    }

    /// Records encoded into the async staging buffer.
    pub fn records_staged(&self) -> u64 {
        self.inner.records_staged.load(Ordering::Relaxed)
    }

    /// Drain passes over the staging buffer.
    pub fn drains(&self) -> u64 {
        self.inner.drains.load(Ordering::Relaxed)
    }

    /// Individual sink write/flush failures.
    pub fn sink_errors(&self) -> u64 {
        self.inner.sink_errors.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            records_dispatched: self.records_dispatched(),
            records_filtered: self.records_filtered(),
            records_staged: self.records_staged(),
            drains: self.drains(),
            sink_errors: self.sink_errors(),
        }
    }
}

/// A point-in-time copy of [`DispatchMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSnapshot {
    /// Records delivered (or staged) after passing the level gate
    pub records_dispatched: u64,
    /// Records rejected by the level gate
    pub records_filtered: u64,
    /// Records encoded into the async staging buffer
    pub records_staged: u64,
    /// Drain passes over the staging buffer
    pub drains: u64,
    /// Individual sink write/flush failures
    pub sink_errors: u64,
}

impl DispatchSnapshot {
    /// Total records that reached the dispatcher.
    pub fn total_records(&self) -> u64 {
        self.records_dispatched
            .saturating_add(self.records_filtered)
    }
}

/// Counters describing analyzer activity.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerMetrics {
    inner: Arc<AnalyzerInner>,
}

#[derive(Debug, Default)]
struct AnalyzerInner {
    /// Messages resolved by exact hash lookup
    exact_matches: AtomicU64,
    /// Messages resolved by similarity search
    similarity_matches: AtomicU64,
    /// New patterns seeded
    patterns_created: AtomicU64,
    /// Patterns removed by age or size eviction
    patterns_evicted: AtomicU64,
}

impl AnalyzerMetrics {
    /// Create a zeroed metrics handle.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_exact_match(&self) {
        self.inner.exact_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_similarity_match(&self) {
        self.inner.similarity_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_created(&self) {
        self.inner.patterns_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: u64) {
        self.inner.patterns_evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// Messages resolved by exact hash lookup.
    pub fn exact_matches(&self) -> u64 {
        self.inner.exact_matches.load(Ordering::Relaxed)
    }

    /// Messages resolved by similarity search.
    pub fn similarity_matches(&self) -> u64 {
        self.inner.similarity_matches.load(Ordering::Relaxed)
    }

    /// New patterns seeded.
    pub fn patterns_created(&self) -> u64 {
        self.inner.patterns_created.load(Ordering::Relaxed)
    }

    /// Patterns removed by age or size eviction.
    pub fn patterns_evicted(&self) -> u64 {
        self.inner.patterns_evicted.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> AnalyzerSnapshot {
        AnalyzerSnapshot {
            exact_matches: self.exact_matches(),
            similarity_matches: self.similarity_matches(),
            patterns_created: self.patterns_created(),
            patterns_evicted: self.patterns_evicted(),
        }
    }
}

/// A point-in-time copy of [`AnalyzerMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerSnapshot {
    /// Messages resolved by exact hash lookup
    pub exact_matches: u64,
    /// Messages resolved by similarity search
    pub similarity_matches: u64,
    /// New patterns seeded
    pub patterns_created: u64,
    /// Patterns removed by age or size eviction
    pub patterns_evicted: u64,
}

impl AnalyzerSnapshot {
    /// Total messages analyzed.
    pub fn total_analyzed(&self) -> u64 {
        self.exact_matches
            .saturating_add(self.similarity_matches)
            .saturating_add(self.patterns_created)
    }
}
