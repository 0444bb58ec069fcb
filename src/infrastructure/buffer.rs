//! Fixed-capacity circular byte buffer.
//!
//! The staging area behind async dispatch and the file sink. Writes never
//! overwrite unread bytes: a full buffer gives the writer a short count,
//! never the reader stale data.

use crate::error::{Error, Result};
use std::sync::Mutex;

/// A bounded FIFO of bytes with interior locking.
///
/// Invariants, maintained under the internal lock:
/// - `read_pos` and `write_pos` are always in `[0, capacity)`
/// - empty iff `read_pos == write_pos` and the full flag is clear
/// - full iff `read_pos == write_pos` and the full flag is set
/// - `len() + free_capacity() == capacity()`
#[derive(Debug)]
pub struct CircularBuffer {
    inner: Mutex<RingState>,
    capacity: usize,
}

#[derive(Debug)]
struct RingState {
    buf: Box<[u8]>,
    read_pos: usize,
    write_pos: usize,
    full: bool,
}

impl RingState {
    fn len(&self) -> usize {
        if self.full {
            self.buf.len()
        } else if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.buf.len() - self.read_pos + self.write_pos
        }
    }
}

impl CircularBuffer {
    /// Create a buffer owning `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RingState {
                buf: vec![0u8; capacity].into_boxed_slice(),
                read_pos: 0,
                write_pos: 0,
                full: false,
            }),
            capacity,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently readable.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Bytes currently writable.
    pub fn free_capacity(&self) -> usize {
        let state = self.lock();
        state.buf.len() - state.len()
    }

    /// True when no bytes are readable.
    pub fn is_empty(&self) -> bool {
        let state = self.lock();
        !state.full && state.read_pos == state.write_pos
    }

    /// Discard all content and rewind both positions.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.read_pos = 0;
        state.write_pos = 0;
        state.full = false;
    }

    /// Append up to `data.len()` bytes, returning how many were written.
    ///
    /// Fills remaining free space and returns a short count (possibly 0)
    /// when the buffer runs out mid-write.
    ///
    /// # Errors
    /// `BufferOverflow` if `data.len()` exceeds the total capacity; nothing
    /// is written in that case.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if data.len() > self.capacity {
            return Err(Error::BufferOverflow {
                requested: data.len(),
                capacity: self.capacity,
            });
        }

        let mut state = self.lock();
        let free = state.buf.len() - state.len();
        let n = data.len().min(free);
        if n == 0 {
            return Ok(0);
        }

        // At most two contiguous segments: up to the end of the backing
        // array, then wrapped to the front.
        let cap = state.buf.len();
        let first = n.min(cap - state.write_pos);
        let write_pos = state.write_pos;
        state.buf[write_pos..write_pos + first].copy_from_slice(&data[..first]);
        if first < n {
            state.buf[..n - first].copy_from_slice(&data[first..n]);
        }

        state.write_pos = (state.write_pos + n) % cap;
        if state.write_pos == state.read_pos {
            state.full = true;
        }
        Ok(n)
    }

    /// Copy up to `dst.len()` bytes out, returning how many were read.
    ///
    /// # Errors
    /// `BufferUnderflow` if the buffer is empty on entry.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        let mut state = self.lock();
        let available = state.len();
        if available == 0 {
            return Err(Error::BufferUnderflow);
        }

        let n = dst.len().min(available);
        if n == 0 {
            return Ok(0);
        }

        let cap = state.buf.len();
        let first = n.min(cap - state.read_pos);
        let read_pos = state.read_pos;
        dst[..first].copy_from_slice(&state.buf[read_pos..read_pos + first]);
        if first < n {
            dst[first..n].copy_from_slice(&state.buf[..n - first]);
        }

        state.read_pos = (state.read_pos + n) % cap;
        state.full = false;
        Ok(n)
    }

    /// The critical sections keep the ring consistent at every exit, so a
    /// poisoned lock (a panicking reader/writer thread) is recoverable.
    fn lock(&self) -> std::sync::MutexGuard<'_, RingState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
