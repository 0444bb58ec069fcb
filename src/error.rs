//! Error taxonomy shared across the crate.
//!
//! Each variant corresponds to one failure kind a caller can meaningfully
//! react to. Sink I/O faults travel as [`Error::Io`]; everything else is a
//! crate-level condition.

use std::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure kinds raised by logweave.
#[derive(Debug)]
pub enum Error {
    /// A circular-buffer write was asked to accept more bytes than the
    /// buffer's total capacity.
    BufferOverflow {
        /// Bytes the caller tried to write
        requested: usize,
        /// Total capacity of the buffer
        capacity: usize,
    },
    /// A circular-buffer read was issued against an empty buffer.
    BufferUnderflow,
    /// The buffer pool is at its configured slot cap and has no free slot.
    BufferFull,
    /// A formatted record exceeded the dispatcher's scratch buffer.
    MessageTooLarge {
        /// Scratch capacity in bytes
        limit: usize,
    },
    /// Contradictory or incomplete configuration.
    InvalidConfiguration(String),
    /// The process-wide default logger was initialized twice.
    AlreadyInitialized,
    /// A step of the file rotation protocol failed; the sink is degraded
    /// until reinitialized.
    FileRotationFailed,
    /// The OS refused exclusive access to a log file.
    FileLockFailed,
    /// Format arguments did not match the record template.
    FormattingError,
    /// Reserved for the filter subsystem.
    FilterError,
    /// An allocation failed.
    OutOfMemory,
    /// Raw I/O error from a sink.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "write of {} bytes exceeds buffer capacity of {} bytes",
                requested, capacity
            ),
            Error::BufferUnderflow => write!(f, "read from empty buffer"),
            Error::BufferFull => write!(f, "buffer pool has no free slot"),
            Error::MessageTooLarge { limit } => {
                write!(f, "formatted record exceeds {} byte scratch buffer", limit)
            }
            Error::InvalidConfiguration(reason) => {
                write!(f, "invalid configuration: {}", reason)
            }
            Error::AlreadyInitialized => {
                write!(f, "default logger is already initialized")
            }
            Error::FileRotationFailed => {
                write!(f, "log file rotation failed; sink is degraded")
            }
            Error::FileLockFailed => write!(f, "could not obtain exclusive access to log file"),
            Error::FormattingError => write!(f, "format arguments do not match template"),
            Error::FilterError => write!(f, "filter rejected the record"),
            Error::OutOfMemory => write!(f, "allocation failed"),
            Error::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::FormattingError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = Error::BufferOverflow {
            requested: 100,
            capacity: 64,
        };
        assert!(e.to_string().contains("100"));
        assert!(e.to_string().contains("64"));

        let e = Error::MessageTooLarge { limit: 4096 };
        assert!(e.to_string().contains("4096"));

        let e = Error::InvalidConfiguration("file logging without a path".to_string());
        assert!(e.to_string().contains("file logging without a path"));
    }

    #[test]
    fn test_io_source_is_preserved() {
        use std::error::Error as _;

        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let e = Error::from(inner);
        assert!(e.source().is_some());
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn test_fmt_error_maps_to_formatting() {
        let e = Error::from(fmt::Error);
        assert!(matches!(e, Error::FormattingError));
    }
}
