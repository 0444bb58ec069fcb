//! Call-site capture macros.
//!
//! The macros wrap [`Logger::log_with`](crate::Logger::log_with), filling
//! in the source file, line, module path, and calling thread id. Whether
//! that metadata reaches the sinks is still governed by the logger's
//! `enable_metadata` setting.

/// Log at an explicit level, capturing the call site.
///
/// ```rust,no_run
/// use logweave::{log, Level, LogBuilder};
///
/// let logger = LogBuilder::new().metadata(true).build().unwrap();
/// log!(logger, Level::Warn, "disk {}% full", 93);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_with(
            $level,
            ::core::format_args!($($arg)+),
            ::core::option::Option::Some($crate::RecordMetadata::capture(
                ::core::file!(),
                ::core::line!(),
                ::core::module_path!(),
            )),
        )
    };
}

/// Log at `Trace`, capturing the call site.
#[macro_export]
macro_rules! trace_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Trace, $($arg)+)
    };
}

/// Log at `Debug`, capturing the call site.
#[macro_export]
macro_rules! debug_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log at `Info`, capturing the call site.
#[macro_export]
macro_rules! info_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log at `Warn`, capturing the call site.
#[macro_export]
macro_rules! warn_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log at `Error`, capturing the call site.
#[macro_export]
macro_rules! error_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log at `Critical`, capturing the call site.
#[macro_export]
macro_rules! critical_to {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Critical, $($arg)+)
    };
}
