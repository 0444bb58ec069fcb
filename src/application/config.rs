//! Logger and analyzer configuration.
//!
//! [`LogConfig`] is the plain data the [`Logger`](crate::Logger) is built
//! from; [`LogBuilder`] is the fluent assembler. Both validate the same
//! way: contradictory settings fail with
//! [`Error::InvalidConfiguration`](crate::Error::InvalidConfiguration)
//! when the logger is constructed, never later.

use crate::domain::level::Level;
use crate::domain::rules::{CategoryRule, VariableRule};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stream a console sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    /// Standard error (the default for log output)
    #[default]
    Stderr,
    /// Standard output
    Stdout,
}

/// Configuration for a [`Logger`](crate::Logger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Records strictly below this level are dropped before formatting
    pub min_level: Level,
    /// Emit SGR color escapes on the console sink
    pub enable_colors: bool,
    /// Register a console sink at build time
    pub enable_console: bool,
    /// Stream the console sink writes to
    pub console_target: ConsoleTarget,
    /// Register a file sink at build time
    pub enable_file_logging: bool,
    /// Path of the active log file; required when file logging is enabled
    pub file_path: Option<PathBuf>,
    /// Rotation trigger: rotate once the active file reaches this size
    pub max_file_size: u64,
    /// Rotate instead of growing the active file without bound
    pub enable_rotation: bool,
    /// Number of rotated siblings kept (`path.1` .. `path.N`)
    pub max_rotated_files: u32,
    /// Capacity in bytes of each staging circular buffer
    pub buffer_size: usize,
    /// Stage records in a circular buffer and drain in batches
    pub async_mode: bool,
    /// Attach call-site metadata to records
    pub enable_metadata: bool,
    /// File sink flush deadline; compared in whole seconds
    pub flush_interval_ms: u64,
    /// Capacity of the dispatcher's format scratch buffer
    pub max_message_size: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            min_level: Level::Info,
            enable_colors: true,
            enable_console: true,
            console_target: ConsoleTarget::Stderr,
            enable_file_logging: false,
            file_path: None,
            max_file_size: 10 * 1024 * 1024,
            enable_rotation: true,
            max_rotated_files: 5,
            buffer_size: 8192,
            async_mode: false,
            enable_metadata: false,
            flush_interval_ms: 1000,
            max_message_size: 8192,
        }
    }
}

impl LogConfig {
    /// Check the configuration for contradictions.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.enable_file_logging && self.file_path.is_none() {
            return Err(Error::InvalidConfiguration(
                "file logging is enabled but no file path is set".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfiguration(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(Error::InvalidConfiguration(
                "max_message_size must be greater than 0".to_string(),
            ));
        }
        if self.enable_file_logging && self.enable_rotation {
            if self.max_file_size == 0 {
                return Err(Error::InvalidConfiguration(
                    "rotation is enabled but max_file_size is 0".to_string(),
                ));
            }
            if self.max_rotated_files == 0 {
                return Err(Error::InvalidConfiguration(
                    "rotation is enabled but max_rotated_files is 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Fluent assembler for [`LogConfig`], mirroring the field set one setter
/// at a time.
///
/// # Examples
///
/// ```rust,no_run
/// use logweave::{Level, LogBuilder};
///
/// let logger = LogBuilder::new()
///     .min_level(Level::Debug)
///     .file_logging("/var/log/app.log")
///     .max_file_size(1024 * 1024)
///     .rotation(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    config: LogConfig,
}

impl LogBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop records strictly below `level`.
    pub fn min_level(mut self, level: Level) -> Self {
        self.config.min_level = level;
        self
    }

    /// Toggle SGR color escapes on the console sink.
    pub fn colors(mut self, enabled: bool) -> Self {
        self.config.enable_colors = enabled;
        self
    }

    /// Toggle the console sink.
    pub fn console(mut self, enabled: bool) -> Self {
        self.config.enable_console = enabled;
        self
    }

    /// Select the console stream.
    pub fn console_target(mut self, target: ConsoleTarget) -> Self {
        self.config.console_target = target;
        self
    }

    /// Enable the file sink writing to `path`.
    pub fn file_logging(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.enable_file_logging = true;
        self.config.file_path = Some(path.into());
        self
    }

    /// Rotate once the active file reaches `bytes`.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    /// Enable rotation keeping `max_rotated_files` siblings.
    pub fn rotation(mut self, max_rotated_files: u32) -> Self {
        self.config.enable_rotation = true;
        self.config.max_rotated_files = max_rotated_files;
        self
    }

    /// Disable rotation; the active file grows without bound.
    pub fn no_rotation(mut self) -> Self {
        self.config.enable_rotation = false;
        self
    }

    /// Set the staging buffer capacity in bytes.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config.buffer_size = bytes;
        self
    }

    /// Stage records in a circular buffer and drain in batches.
    pub fn async_mode(mut self, enabled: bool) -> Self {
        self.config.async_mode = enabled;
        self
    }

    /// Attach call-site metadata to records.
    pub fn metadata(mut self, enabled: bool) -> Self {
        self.config.enable_metadata = enabled;
        self
    }

    /// Set the file sink flush deadline in milliseconds.
    pub fn flush_interval_ms(mut self, millis: u64) -> Self {
        self.config.flush_interval_ms = millis;
        self
    }

    /// Set the format scratch buffer capacity.
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.config.max_message_size = bytes;
        self
    }

    /// Finish assembling, returning the validated configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for contradictory settings.
    pub fn into_config(self) -> Result<LogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a [`Logger`](crate::Logger) from the assembled configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for contradictory settings, or an
    /// I/O error if the file sink cannot open its path.
    pub fn build(self) -> Result<crate::application::dispatcher::Logger> {
        crate::application::dispatcher::Logger::new(self.into_config()?)
    }
}

/// Configuration for a [`PatternAnalyzer`](crate::PatternAnalyzer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Similarity strictly above this accepts an approximate match
    pub similarity_threshold: f32,
    /// Patterns idle strictly longer than this many seconds are evicted
    pub max_pattern_age: i64,
    /// Hard cap on stored patterns; oldest by recency evicted beyond it
    pub max_patterns: usize,
    /// Token classification rules, tried in order before the heuristic
    pub variable_rules: Vec<VariableRule>,
    /// Category rules, scored per message
    pub category_rules: Vec<CategoryRule>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            max_pattern_age: 86_400,
            max_patterns: 1000,
            variable_rules: Vec::new(),
            category_rules: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Check bounds and re-validate every rule's pattern key (rules that
    /// arrived via deserialization never went through
    /// [`VariableRule::new`]).
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_pattern_age < 0 {
            return Err(Error::InvalidConfiguration(
                "max_pattern_age must not be negative".to_string(),
            ));
        }
        if self.max_patterns == 0 {
            return Err(Error::InvalidConfiguration(
                "max_patterns must be greater than 0".to_string(),
            ));
        }
        for rule in &self.variable_rules {
            if crate::domain::rules::RegexKey::parse(&rule.regex_key).is_none() {
                return Err(Error::InvalidConfiguration(format!(
                    "variable rule '{}' uses unrecognized pattern key '{}'",
                    rule.name, rule.regex_key
                )));
            }
        }
        Ok(())
    }

    /// Append a variable rule.
    pub fn with_variable_rule(mut self, rule: VariableRule) -> Self {
        self.variable_rules.push(rule);
        self
    }

    /// Append a category rule.
    pub fn with_category_rule(mut self, rule: CategoryRule) -> Self {
        self.category_rules.push(rule);
        self
    }
}
