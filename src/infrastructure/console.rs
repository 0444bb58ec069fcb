//! Console sink writing to standard error or standard output.

use crate::application::config::ConsoleTarget;
use crate::application::ports::Sink;
use crate::domain::level::COLOR_RESET;
use crate::domain::record::Record;
use crate::error::{Error, Result};
use std::io::{self, Write};

/// Synchronous sink for terminal output.
///
/// Line format: `[<timestamp>] [<LEVEL>] [<file>:<line>]? <message>`,
/// with the level tag wrapped in SGR color escapes when colors are
/// enabled. Writes go straight to the stream; `flush` is a no-op.
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    colors: bool,
    closed: bool,
}

impl ConsoleSink {
    /// Create a console sink on the given stream.
    pub fn new(target: ConsoleTarget, colors: bool) -> Self {
        Self {
            target,
            colors,
            closed: false,
        }
    }

    /// Create a sink on standard error without colors.
    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr, false)
    }

    fn format_line(&self, record: &Record<'_>) -> String {
        let mut line = String::with_capacity(record.message.len() + 48);
        line.push('[');
        line.push_str(&record.timestamp.to_string());
        line.push_str("] ");
        if self.colors {
            line.push_str(record.level.color_code());
        }
        line.push('[');
        line.push_str(record.level.as_str());
        line.push(']');
        if self.colors {
            line.push_str(COLOR_RESET);
        }
        if let Some(meta) = record.metadata {
            line.push_str(" [");
            line.push_str(&meta.file);
            line.push(':');
            line.push_str(&meta.line.to_string());
            line.push(']');
        }
        line.push(' ');
        line.push_str(record.message);
        line.push('\n');
        line
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, record: &Record<'_>) -> Result<()> {
        if self.closed {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "console sink is closed",
            )));
        }
        let line = self.format_line(record);
        match self.target {
            ConsoleTarget::Stderr => io::stderr().lock().write_all(line.as_bytes())?,
            ConsoleTarget::Stdout => io::stdout().lock().write_all(line.as_bytes())?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // stderr is unbuffered and stdout's line discipline is the
        // terminal's business.
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
