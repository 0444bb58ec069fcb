//! Grow-on-demand object pool with usage statistics.
//!
//! Slots are created by a caller-supplied constructor and handed out as
//! [`PoolRef`] guards; dropping the guard returns the slot. The pool
//! doubles its backing array when exhausted (unless capped) and can
//! compact unused tail slots with [`Pool::shrink_to_fit`].

use crate::error::{Error, Result};
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

/// A pool of reusable `T` slots.
///
/// A single lock protects the slot array and the statistics. Values live
/// in their own heap allocations, so a slot's address is stable for the
/// lifetime of its guard even while the pool grows or shrinks around it.
pub struct Pool<T> {
    shared: Arc<PoolShared<T>>,
}

struct PoolShared<T> {
    state: Mutex<PoolState<T>>,
}

struct PoolState<T> {
    slots: Vec<Slot<T>>,
    create: Box<dyn Fn() -> T + Send>,
    in_use: usize,
    peak_usage: usize,
    max_slots: Option<usize>,
}

struct Slot<T> {
    value: Box<T>,
    in_use: bool,
}

/// Usage statistics for a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Slots currently backed by the pool
    pub total_slots: usize,
    /// Slots currently lent out
    pub in_use: usize,
    /// High-water mark of concurrently lent slots; never decreases
    pub peak_usage: usize,
}

impl<T: Send + Sync> Pool<T> {
    /// Create a pool with `initial_slots` slots, each built by `create`.
    pub fn new(initial_slots: usize, create: impl Fn() -> T + Send + 'static) -> Self {
        let slots = (0..initial_slots)
            .map(|_| Slot {
                value: Box::new(create()),
                in_use: false,
            })
            .collect();
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    slots,
                    create: Box::new(create),
                    in_use: 0,
                    peak_usage: 0,
                    max_slots: None,
                }),
            }),
        }
    }

    /// Cap the pool at `max_slots` slots. An exhausted, capped pool fails
    /// `acquire` with `BufferFull` instead of growing.
    pub fn with_max_slots(self, max_slots: usize) -> Self {
        self.lock().max_slots = Some(max_slots);
        self
    }

    /// Borrow a slot, growing the pool if every slot is lent out.
    ///
    /// Growth doubles the backing array (one slot minimum) and returns the
    /// first new slot.
    ///
    /// # Errors
    /// `BufferFull` when the pool is capped and no slot is free.
    pub fn acquire(&self) -> Result<PoolRef<T>> {
        let mut state = self.lock();

        let index = match state.slots.iter().position(|slot| !slot.in_use) {
            Some(index) => index,
            None => {
                let old_len = state.slots.len();
                let mut target = (old_len * 2).max(1);
                if let Some(max) = state.max_slots {
                    target = target.min(max);
                }
                if target <= old_len {
                    return Err(Error::BufferFull);
                }
                for _ in old_len..target {
                    let value = Box::new((state.create)());
                    state.slots.push(Slot {
                        value,
                        in_use: false,
                    });
                }
                old_len
            }
        };

        state.slots[index].in_use = true;
        state.in_use += 1;
        state.peak_usage = state.peak_usage.max(state.in_use);

        // Box gives the value a stable heap address, and an in-use slot is
        // never truncated by shrink_to_fit, so the pointer stays valid
        // until the guard drops.
        let ptr = NonNull::from(state.slots[index].value.as_ref());
        Ok(PoolRef {
            shared: Arc::clone(&self.shared),
            index,
            ptr,
        })
    }

    /// Drop unused tail slots, leaving room for `ceil(in_use * 1.25)`.
    ///
    /// Only free slots at the end of the array are removed; a lent slot
    /// blocks compaction below its index.
    pub fn shrink_to_fit(&self) {
        let mut state = self.lock();
        let target = (state.in_use * 5 + 3) / 4;
        while state.slots.len() > target {
            let tail_is_free = state.slots.last().map(|s| !s.in_use).unwrap_or(false);
            if !tail_is_free {
                break;
            }
            state.slots.pop();
        }
    }

    /// Current usage statistics.
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            total_slots: state.slots.len(),
            in_use: state.in_use,
            peak_usage: state.peak_usage,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.shared.lock()
    }
}

impl<T> PoolShared<T> {
    // Slot bookkeeping is consistent at every critical-section exit, so a
    // poisoned lock is recoverable.
    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Pool")
            .field("total_slots", &state.slots.len())
            .field("in_use", &state.in_use)
            .field("peak_usage", &state.peak_usage)
            .finish()
    }
}

/// Guard for a borrowed pool slot.
///
/// Dereferences to the slot value; dropping it returns the slot to the
/// pool. The value must not be used after the guard drops, which the
/// borrow checker enforces.
pub struct PoolRef<T> {
    shared: Arc<PoolShared<T>>,
    index: usize,
    ptr: NonNull<T>,
}

impl<T> Deref for PoolRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The slot is marked in-use for this guard's whole lifetime, so
        // the pool never drops or truncates it while we hold the pointer.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for PoolRef<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        let released = state
            .slots
            .get_mut(self.index)
            .map(|slot| std::mem::replace(&mut slot.in_use, false))
            .unwrap_or(false);
        if released {
            state.in_use -= 1;
        }
    }
}

impl<T> fmt::Debug for PoolRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRef").field("index", &self.index).finish()
    }
}

// Access through the guard is a shared reference to T behind a stable
// heap allocation; the guard itself only touches the pool lock on drop.
unsafe impl<T: Send + Sync> Send for PoolRef<T> {}
unsafe impl<T: Send + Sync> Sync for PoolRef<T> {}
