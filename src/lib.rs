//! # logweave
//!
//! Structured logging with multi-sink dispatch, size-based file rotation,
//! and an embedded log-pattern analysis engine.
//!
//! The crate has two independent cores:
//!
//! - A [`Logger`] that gates records by severity, formats each payload
//!   once, and fans it out to console and file sinks. Async mode stages
//!   encoded records in a circular buffer and drains them in batches.
//! - A [`PatternAnalyzer`] that recognizes recurring message templates by
//!   content hash with an approximate-match fallback, extracts variable
//!   fields, assigns categories from keyword rules, and evicts templates
//!   by age and store size.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use logweave::{info_to, Level, LogBuilder};
//!
//! let logger = LogBuilder::new()
//!     .min_level(Level::Info)
//!     .file_logging("/var/log/app.log")
//!     .max_file_size(10 * 1024 * 1024)
//!     .rotation(5)
//!     .build()
//!     .unwrap();
//!
//! info_to!(logger, "listening on {}", "0.0.0.0:8080").unwrap();
//! logger.flush().unwrap();
//! ```
//!
//! Pattern analysis runs on its own path:
//!
//! ```rust
//! use logweave::{AnalyzerConfig, PatternAnalyzer};
//!
//! let analyzer = PatternAnalyzer::new(AnalyzerConfig::default()).unwrap();
//! let pattern = analyzer.analyze("User admin logged in from 192.168.1.1");
//! let again = analyzer.analyze("User john logged in from 192.168.1.2");
//! assert_eq!(pattern.hash, again.hash);
//! ```
//!
//! ## Features
//!
//! - **Severity gating**: records below the configured minimum are
//!   rejected before any formatting or locking
//! - **Multi-sink fan-out**: per-record delivery in registration order;
//!   one failing sink never starves the others
//! - **File rotation**: `app.log` promotes to `app.log.1` and siblings
//!   shift upward once the active file passes the size limit
//! - **Async staging**: records coalesce in a circular buffer and drain
//!   at 75 % fill or on a 100 ms deadline
//! - **Pattern recognition**: wyhash identity with byte-set similarity
//!   fallback, variable extraction, keyword categorization, and bounded
//!   storage with age/size eviction

// Domain layer - pure logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - adapters
pub mod infrastructure;

pub mod error;

mod macros;

// Re-export commonly used types for convenience
pub use error::{Error, Result};

pub use domain::{
    level::{Level, COLOR_RESET},
    pattern::{message_hash, Pattern, PatternMetadata, PatternType, Variable, VariableType},
    record::{Record, RecordMetadata},
    rules::{CategoryRule, RegexKey, VariableRule, KEY_DIGITS, KEY_EMAIL, KEY_IPV4, KEY_UUID},
    similarity::byte_set_similarity,
};

pub use application::{
    analyzer::PatternAnalyzer,
    config::{AnalyzerConfig, ConsoleTarget, LogBuilder, LogConfig},
    dispatcher::{Logger, SinkHandle},
    metrics::{AnalyzerMetrics, AnalyzerSnapshot, DispatchMetrics, DispatchSnapshot},
    ports::{Clock, Sink},
};

pub use infrastructure::{
    buffer::CircularBuffer,
    clock::SystemClock,
    console::ConsoleSink,
    file::FileSink,
    global::{deinit, get_default_logger, init, init_with_config, is_initialized},
    pool::{Pool, PoolRef, PoolStats},
};
