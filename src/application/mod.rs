//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain concepts and owns the runtime
//! behavior:
//! - The dispatcher ([`Logger`](dispatcher::Logger)): level gate,
//!   formatting, multi-sink fan-out, async staging
//! - The [`PatternAnalyzer`](analyzer::PatternAnalyzer)
//! - Configuration and the fluent builder
//! - Observability metrics
//!
//! ## Ports
//!
//! The application layer defines the [`Sink`](ports::Sink) and
//! [`Clock`](ports::Clock) ports that infrastructure adapters implement,
//! keeping it independent from I/O details.

pub mod analyzer;
pub mod config;
pub mod dispatcher;
pub mod metrics;
pub mod ports;
