//! Process-wide default logger handle.
//!
//! Optional convenience layer: a single locked slot holding one shared
//! [`Logger`]. Nothing in the dispatcher or analyzer depends on it;
//! applications that prefer explicit injection can ignore this module
//! entirely.

use crate::application::config::LogConfig;
use crate::application::dispatcher::Logger;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

static DEFAULT_LOGGER: Mutex<Option<Arc<Logger>>> = Mutex::new(None);

/// Install a default logger built from `LogConfig::default()`.
///
/// # Errors
/// `AlreadyInitialized` if a default logger is already installed, or any
/// error from logger construction.
pub fn init() -> Result<()> {
    init_with_config(LogConfig::default())
}

/// Install a default logger built from the given configuration.
///
/// # Errors
/// `AlreadyInitialized` if a default logger is already installed, or any
/// error from logger construction.
pub fn init_with_config(config: LogConfig) -> Result<()> {
    let mut slot = lock();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *slot = Some(Arc::new(Logger::new(config)?));
    Ok(())
}

/// Close and discard the default logger, if any. Idempotent.
pub fn deinit() {
    let logger = lock().take();
    if let Some(logger) = logger {
        logger.close();
    }
}

/// Whether a default logger is currently installed.
pub fn is_initialized() -> bool {
    lock().is_some()
}

/// Shared handle to the default logger, if one is installed.
pub fn get_default_logger() -> Option<Arc<Logger>> {
    lock().clone()
}

// The slot only ever holds a fully constructed logger, so a poisoned
// lock is recoverable.
fn lock() -> MutexGuard<'static, Option<Arc<Logger>>> {
    DEFAULT_LOGGER.lock().unwrap_or_else(|e| e.into_inner())
}
