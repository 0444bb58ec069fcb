//! The logger: level gate, formatting, and multi-sink fan-out.
//!
//! A [`Logger`] owns its sinks and one lock. Every accepted record is
//! formatted exactly once into a bounded scratch buffer and then either
//! delivered to each sink in registration order (sync mode) or encoded
//! into a staging circular buffer and drained in batches (async mode).
//!
//! Sink failures are reported on the diagnostic channel and never stop
//! delivery to the remaining sinks; the first failure is returned to the
//! caller as the aggregate outcome once fan-out completes.

use crate::application::config::LogConfig;
use crate::application::metrics::DispatchMetrics;
use crate::application::ports::{Clock, Sink};
use crate::domain::level::Level;
use crate::domain::record::{Record, RecordMetadata};
use crate::error::{Error, Result};
use crate::infrastructure::buffer::CircularBuffer;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::console::ConsoleSink;
use crate::infrastructure::file::FileSink;
use crate::infrastructure::pool::{Pool, PoolRef};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Staging drains once the buffer is at least this full.
const DRAIN_FILL_NUMERATOR: usize = 3;
const DRAIN_FILL_DENOMINATOR: usize = 4;
/// Staging also drains once this many milliseconds pass without one.
const DRAIN_INTERVAL_MS: u64 = 100;

/// Identifier returned by [`Logger::add_sink`] for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkHandle(u64);

struct RegisteredSink {
    handle: SinkHandle,
    sink: Box<dyn Sink>,
}

struct DispatchState {
    /// Fan-out order is registration order.
    sinks: Vec<RegisteredSink>,
    next_handle: u64,
    /// Reusable format scratch; capacity is the configured cap.
    scratch: String,
    /// Async staging buffer, borrowed from the pool while async mode is on.
    staging: Option<PoolRef<CircularBuffer>>,
    last_drain_ms: u64,
}

/// Thread-safe multi-sink log dispatcher.
///
/// Records are totally ordered by acquisition of the dispatcher lock;
/// bytes of different records never interleave within a sink.
pub struct Logger {
    config: LogConfig,
    clock: Arc<dyn Clock>,
    metrics: DispatchMetrics,
    buffer_pool: Pool<CircularBuffer>,
    state: Mutex<DispatchState>,
    closed: AtomicBool,
}

impl Logger {
    /// Build a logger from a validated configuration, constructing the
    /// configured sinks.
    ///
    /// # Errors
    /// `InvalidConfiguration` for contradictory settings; I/O errors if
    /// the file sink cannot open its path.
    pub fn new(config: LogConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Build a logger with an explicit clock (mainly for testing).
    ///
    /// # Errors
    /// Same conditions as [`Logger::new`].
    pub fn with_clock(config: LogConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let buffer_size = config.buffer_size;
        let buffer_pool = Pool::new(0, move || CircularBuffer::new(buffer_size));

        let mut sinks = Vec::new();
        let mut next_handle = 0u64;
        if config.enable_console {
            sinks.push(RegisteredSink {
                handle: SinkHandle(next_handle),
                sink: Box::new(ConsoleSink::new(config.console_target, config.enable_colors)),
            });
            next_handle += 1;
        }
        if config.enable_file_logging {
            // validate() guarantees the path is present.
            let path = config.file_path.clone().ok_or_else(|| {
                Error::InvalidConfiguration("file logging without a path".to_string())
            })?;
            sinks.push(RegisteredSink {
                handle: SinkHandle(next_handle),
                sink: Box::new(FileSink::new(path, &config, Arc::clone(&clock))?),
            });
            next_handle += 1;
        }

        let staging = if config.async_mode {
            Some(buffer_pool.acquire()?)
        } else {
            None
        };

        let scratch = String::with_capacity(config.max_message_size);
        let last_drain_ms = clock.epoch_millis();
        Ok(Self {
            config,
            clock,
            metrics: DispatchMetrics::new(),
            buffer_pool,
            state: Mutex::new(DispatchState {
                sinks,
                next_handle,
                scratch,
                staging,
                last_drain_ms,
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Start assembling a logger configuration.
    pub fn builder() -> crate::application::config::LogBuilder {
        crate::application::config::LogBuilder::new()
    }

    /// Log a pre-formatted or `format_args!`-built payload.
    ///
    /// Records below the configured minimum level return `Ok` without
    /// formatting or locking.
    ///
    /// # Errors
    /// `MessageTooLarge` if the formatted payload exceeds the scratch
    /// capacity; otherwise the first sink failure after full fan-out.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) -> Result<()> {
        self.log_with(level, args, None)
    }

    /// Log with call-site metadata.
    ///
    /// Metadata is dropped unless `enable_metadata` is set. A metadata
    /// timestamp of zero is stamped from the dispatcher clock.
    ///
    /// # Errors
    /// Same conditions as [`Logger::log`].
    pub fn log_with(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
        metadata: Option<RecordMetadata>,
    ) -> Result<()> {
        if level < self.config.min_level {
            self.metrics.record_filtered();
            return Ok(());
        }
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let now_secs = self.clock.epoch_secs();
        let now_ms = self.clock.epoch_millis();
        let mut metadata = if self.config.enable_metadata {
            metadata
        } else {
            None
        };
        if let Some(meta) = metadata.as_mut() {
            if meta.timestamp == 0 {
                meta.timestamp = now_secs;
            }
        }

        let mut state = self.lock();
        let DispatchState {
            sinks,
            scratch,
            staging,
            last_drain_ms,
            ..
        } = &mut *state;

        format_payload(scratch, args, self.config.max_message_size)?;
        let record = Record {
            level,
            timestamp: now_secs,
            message: scratch.as_str(),
            metadata: metadata.as_ref(),
        };

        let outcome = match staging {
            Some(staging) => {
                let result = self.stage_record(sinks, staging, last_drain_ms, &record, now_ms);
                self.metrics.record_dispatched();
                result
            }
            None => {
                self.metrics.record_dispatched();
                self.deliver(sinks, &record)
            }
        };
        outcome
    }

    /// Encode the record into the staging buffer, draining as needed.
    fn stage_record(
        &self,
        sinks: &mut [RegisteredSink],
        staging: &PoolRef<CircularBuffer>,
        last_drain_ms: &mut u64,
        record: &Record<'_>,
        now_ms: u64,
    ) -> Result<()> {
        let frame = frame::encode(record);

        // A frame the buffer could never hold bypasses staging entirely,
        // after a drain so ordering is preserved.
        if frame.len() > staging.capacity() {
            self.drain(sinks, staging, last_drain_ms, now_ms)?;
            return self.deliver(sinks, record);
        }

        if staging.free_capacity() < frame.len() {
            self.drain(sinks, staging, last_drain_ms, now_ms)?;
        }
        staging.write(&frame)?;
        self.metrics.record_staged();

        let fill_reached =
            staging.len() * DRAIN_FILL_DENOMINATOR >= staging.capacity() * DRAIN_FILL_NUMERATOR;
        let interval_reached = now_ms.saturating_sub(*last_drain_ms) >= DRAIN_INTERVAL_MS;
        if fill_reached || interval_reached {
            self.drain(sinks, staging, last_drain_ms, now_ms)?;
        }
        Ok(())
    }

    /// Decode every staged frame and deliver it to all sinks.
    fn drain(
        &self,
        sinks: &mut [RegisteredSink],
        staging: &PoolRef<CircularBuffer>,
        last_drain_ms: &mut u64,
        now_ms: u64,
    ) -> Result<()> {
        *last_drain_ms = now_ms;
        let staged = staging.len();
        if staged == 0 {
            return Ok(());
        }

        let mut buf = vec![0u8; staged];
        let mut filled = 0;
        while filled < buf.len() {
            match staging.read(&mut buf[filled..]) {
                Ok(n) => filled += n,
                // No more data; the staging buffer is drained.
                Err(Error::BufferUnderflow) => break,
                Err(e) => return Err(e),
            }
        }
        self.metrics.record_drain();

        let mut first_err = None;
        let mut offset = 0;
        while offset < filled {
            let Some((staged_record, consumed)) = frame::decode(&buf[offset..filled]) else {
                // A partial frame can only mean staging corruption; drop
                // the remainder rather than replaying garbage.
                tracing::error!(
                    remaining = filled - offset,
                    "malformed staging frame; discarding drain remainder"
                );
                break;
            };
            offset += consumed;

            let record = Record {
                level: staged_record.level,
                timestamp: staged_record.timestamp,
                message: &staged_record.message,
                metadata: staged_record.metadata.as_ref(),
            };
            if let Err(e) = self.deliver(sinks, &record) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Fan a record out to every sink in registration order. Failures are
    /// reported and counted but never stop delivery; the first one is the
    /// aggregate result.
    fn deliver(&self, sinks: &mut [RegisteredSink], record: &Record<'_>) -> Result<()> {
        let mut first_err = None;
        for registered in sinks.iter_mut() {
            if let Err(e) = registered.sink.write(record) {
                self.metrics.record_sink_error();
                tracing::warn!(sink = registered.handle.0, error = %e, "sink write failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Register an additional sink; it joins the end of the fan-out order
    /// and is owned by the logger from here on.
    pub fn add_sink(&self, sink: Box<dyn Sink>) -> SinkHandle {
        let mut state = self.lock();
        let handle = SinkHandle(state.next_handle);
        state.next_handle += 1;
        state.sinks.push(RegisteredSink { handle, sink });
        handle
    }

    /// Close and discard the sink registered under `handle`.
    ///
    /// Returns false if the handle is unknown (already removed).
    pub fn remove_sink(&self, handle: SinkHandle) -> bool {
        let mut state = self.lock();
        match state.sinks.iter().position(|rs| rs.handle == handle) {
            Some(index) => {
                let mut removed = state.sinks.remove(index);
                removed.sink.close();
                true
            }
            None => false,
        }
    }

    /// Drain staged records and flush every sink.
    ///
    /// A flush with nothing staged and nothing buffered is a no-op.
    ///
    /// # Errors
    /// The first sink failure after every sink was asked to flush.
    pub fn flush(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        let now_ms = self.clock.epoch_millis();
        let mut state = self.lock();
        let DispatchState {
            sinks,
            staging,
            last_drain_ms,
            ..
        } = &mut *state;

        let mut first_err = None;
        if let Some(staging) = staging {
            if let Err(e) = self.drain(sinks, staging, last_drain_ms, now_ms) {
                first_err = Some(e);
            }
        }
        for registered in sinks.iter_mut() {
            if let Err(e) = registered.sink.flush() {
                self.metrics.record_sink_error();
                tracing::warn!(sink = registered.handle.0, error = %e, "sink flush failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Deterministic shutdown: drain staged records, flush, and close
    /// every sink. Safe to call more than once; later calls do nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let now_ms = self.clock.epoch_millis();
        let mut state = self.lock();
        let DispatchState {
            sinks,
            staging,
            last_drain_ms,
            ..
        } = &mut *state;

        if let Some(staging_ref) = staging {
            if let Err(e) = self.drain(sinks, staging_ref, last_drain_ms, now_ms) {
                tracing::warn!(error = %e, "drain during logger close failed");
            }
        }
        for registered in sinks.iter_mut() {
            if let Err(e) = registered.sink.flush() {
                tracing::warn!(sink = registered.handle.0, error = %e, "flush during logger close failed");
            }
            registered.sink.close();
        }
        sinks.clear();
        // Return the staging buffer to the pool.
        *staging = None;
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Observability counters.
    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Active configuration.
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// The pool that backs staging buffers.
    pub fn buffer_pool(&self) -> &Pool<CircularBuffer> {
        &self.buffer_pool
    }

    // Delivery and staging leave the state consistent at every exit, so a
    // poisoned lock is recoverable.
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.config.min_level)
            .field("async_mode", &self.config.async_mode)
            .field("sinks", &self.lock().sinks.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

/// Format `args` into the reusable scratch, enforcing the size cap.
fn format_payload(scratch: &mut String, args: fmt::Arguments<'_>, limit: usize) -> Result<()> {
    use fmt::Write;

    scratch.clear();
    let mut writer = BoundedWriter {
        buf: scratch,
        limit,
        overflowed: false,
    };
    match writer.write_fmt(args) {
        Ok(()) => Ok(()),
        Err(_) if writer.overflowed => Err(Error::MessageTooLarge { limit }),
        Err(_) => Err(Error::FormattingError),
    }
}

/// `fmt::Write` adapter that refuses to grow past `limit` bytes.
struct BoundedWriter<'a> {
    buf: &'a mut String,
    limit: usize,
    overflowed: bool,
}

impl fmt::Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.limit {
            self.overflowed = true;
            return Err(fmt::Error);
        }
        self.buf.push_str(s);
        Ok(())
    }
}

/// Wire codec for staged records.
///
/// Layout: `[level u8][flags u8][timestamp i64 LE][msg_len u32 LE]`, then
/// when metadata is present `[thread_id u64 LE][line u32 LE]
/// [file_len u16 LE][function_len u16 LE][file][function]`, then the
/// message bytes.
mod frame {
    use super::*;

    const FLAG_METADATA: u8 = 0b0000_0001;
    const HEADER_LEN: usize = 1 + 1 + 8 + 4;
    const META_HEADER_LEN: usize = 8 + 4 + 2 + 2;

    /// An owned record decoded from the staging buffer.
    pub(super) struct StagedRecord {
        pub level: Level,
        pub timestamp: i64,
        pub message: String,
        pub metadata: Option<RecordMetadata>,
    }

    pub(super) fn encode(record: &Record<'_>) -> Vec<u8> {
        let msg = record.message.as_bytes();
        let mut frame = Vec::with_capacity(HEADER_LEN + META_HEADER_LEN + msg.len() + 64);
        frame.push(record.level.to_u8());
        frame.push(if record.metadata.is_some() {
            FLAG_METADATA
        } else {
            0
        });
        frame.extend_from_slice(&record.timestamp.to_le_bytes());
        frame.extend_from_slice(&(msg.len() as u32).to_le_bytes());
        if let Some(meta) = record.metadata {
            // Paths longer than a u16 cannot happen in practice; clamp so
            // the frame stays parseable regardless.
            let file = &meta.file.as_bytes()[..meta.file.len().min(u16::MAX as usize)];
            let function = &meta.function.as_bytes()[..meta.function.len().min(u16::MAX as usize)];
            frame.extend_from_slice(&meta.thread_id.to_le_bytes());
            frame.extend_from_slice(&meta.line.to_le_bytes());
            frame.extend_from_slice(&(file.len() as u16).to_le_bytes());
            frame.extend_from_slice(&(function.len() as u16).to_le_bytes());
            frame.extend_from_slice(file);
            frame.extend_from_slice(function);
        }
        frame.extend_from_slice(msg);
        frame
    }

    /// Decode one frame from the front of `buf`, returning it with the
    /// number of bytes consumed, or `None` if `buf` holds no complete
    /// frame.
    pub(super) fn decode(buf: &[u8]) -> Option<(StagedRecord, usize)> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let level = Level::from_u8(buf[0]);
        let has_metadata = buf[1] & FLAG_METADATA != 0;
        let timestamp = i64::from_le_bytes(buf[2..10].try_into().ok()?);
        let msg_len = u32::from_le_bytes(buf[10..14].try_into().ok()?) as usize;

        let mut offset = HEADER_LEN;
        let metadata = if has_metadata {
            if buf.len() < offset + META_HEADER_LEN {
                return None;
            }
            let thread_id = u64::from_le_bytes(buf[offset..offset + 8].try_into().ok()?);
            let line = u32::from_le_bytes(buf[offset + 8..offset + 12].try_into().ok()?);
            let file_len =
                u16::from_le_bytes(buf[offset + 12..offset + 14].try_into().ok()?) as usize;
            let function_len =
                u16::from_le_bytes(buf[offset + 14..offset + 16].try_into().ok()?) as usize;
            offset += META_HEADER_LEN;
            if buf.len() < offset + file_len + function_len {
                return None;
            }
            let file = String::from_utf8_lossy(&buf[offset..offset + file_len]).into_owned();
            offset += file_len;
            let function =
                String::from_utf8_lossy(&buf[offset..offset + function_len]).into_owned();
            offset += function_len;
            Some(RecordMetadata {
                timestamp,
                thread_id,
                file,
                line,
                function,
            })
        } else {
            None
        };

        if buf.len() < offset + msg_len {
            return None;
        }
        let message = String::from_utf8_lossy(&buf[offset..offset + msg_len]).into_owned();
        offset += msg_len;

        Some((
            StagedRecord {
                level,
                timestamp,
                message,
                metadata,
            },
            offset,
        ))
    }

}
