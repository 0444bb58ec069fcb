//! Severity levels for log records.
//!
//! Levels form a total order (`Trace < Debug < Info < Warn < Error <
//! Critical`). A logger's configured minimum level filters every record
//! strictly below it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SGR escape that resets console colors.
pub const COLOR_RESET: &str = "\x1b[0m";

/// Severity of a log record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    /// Finest-grained diagnostic detail
    Trace = 0,
    /// Developer-facing debugging information
    Debug = 1,
    /// Routine operational messages
    #[default]
    Info = 2,
    /// Something unexpected that the system recovered from
    Warn = 3,
    /// An operation failed
    Error = 4,
    /// The system cannot continue normally
    Critical = 5,
}

impl Level {
    /// Display name used in formatted records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// SGR color escape emitted before the level tag on color-enabled
    /// console sinks. Pair with [`COLOR_RESET`].
    pub fn color_code(&self) -> &'static str {
        match self {
            Level::Trace => "\x1b[90m",
            Level::Debug => "\x1b[36m",
            Level::Info => "\x1b[32m",
            Level::Warn => "\x1b[33m",
            Level::Error => "\x1b[31m",
            Level::Critical => "\x1b[35m",
        }
    }

    /// Stable wire encoding used by the async staging frames.
    pub(crate) fn to_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Level::to_u8`]. Unknown bytes decode as `Info` so a
    /// corrupted frame never aborts a drain.
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            5 => Level::Critical,
            _ => Level::Info,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "err" | "error" => Ok(Level::Error),
            "critical" | "fatal" => Ok(Level::Critical),
            other => Err(crate::error::Error::InvalidConfiguration(format!(
                "unknown level name: {}",
                other
            ))),
        }
    }
}
