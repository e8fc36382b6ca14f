//! Circular buffer storage for the bounded SPSC queue.

use std::mem::MaybeUninit;

use crossbeam_utils::CachePadded;

use super::Full;
use crate::sync::{AtomicUsize, Ordering, UnsafeCell};

/// Slot storage plus the two cursors.
///
/// ```text
/// ┌────────────────────────────────────────────────────┐
/// │ first (cache-line padded) - next slot to pop       │
/// ├────────────────────────────────────────────────────┤
/// │ next_write (cache-line padded) - next slot to push │
/// ├────────────────────────────────────────────────────┤
/// │ buffer: [T; slots]                                 │
/// └────────────────────────────────────────────────────┘
/// ```
///
/// Slots in `[first, next_write)` (wrapping) hold values and belong to the
/// consumer; every other slot belongs to the producer. `first == next_write`
/// is empty, `advance(next_write) == first` is full, so one slot is always
/// unused.
#[repr(C)]
pub(super) struct Ring<T> {
    /// Advanced only by the consumer.
    first: CachePadded<AtomicUsize>,
    /// Advanced only by the producer.
    next_write: CachePadded<AtomicUsize>,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// The cursors partition the buffer between the two sides; each slot is
// touched by one thread at a time.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    pub(super) fn new(slots: usize) -> Self {
        assert!(slots >= 2, "bounded queue needs at least two slots");

        let buffer = (0..slots)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Self {
            first: CachePadded::new(AtomicUsize::new(0)),
            next_write: CachePadded::new(AtomicUsize::new(0)),
            buffer,
        }
    }

    /// Total slots, including the one kept empty.
    #[inline]
    pub(super) fn slots(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub(super) fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    /// `(index + 1) % slots`, without the division.
    #[inline(always)]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next < self.buffer.len() { next } else { 0 }
    }

    #[inline(always)]
    fn load_first(&self) -> usize {
        self.first.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn load_next_write(&self) -> usize {
        self.next_write.load(Ordering::Acquire)
    }

    #[inline]
    pub(super) fn is_empty(&self) -> bool {
        self.load_first() == self.load_next_write()
    }

    #[inline]
    pub(super) fn is_full(&self) -> bool {
        self.load_first() == self.advance(self.load_next_write())
    }

    /// Snapshot of the number of queued values.
    #[inline]
    pub(super) fn len(&self) -> usize {
        let first = self.load_first();
        let next_write = self.load_next_write();
        if next_write >= first {
            next_write - first
        } else {
            self.buffer.len() - first + next_write
        }
    }

    /// Writes `value` at `next_write` and publishes it.
    ///
    /// # Safety
    ///
    /// Only one thread may act as producer at a time.
    #[inline]
    pub(super) unsafe fn push(&self, value: T) -> Result<(), Full<T>> {
        let first = self.load_first();
        let next_write = self.load_next_write();
        let candidate = self.advance(next_write);
        if candidate == first {
            return Err(Full(value));
        }

        // SAFETY: next_write is outside [first, next_write), so the consumer
        // does not touch this slot until the store below publishes it.
        self.buffer[next_write].with_mut(|slot| unsafe {
            (*slot).write(value);
        });
        // Release orders the slot write before the cursor becomes visible.
        self.next_write.store(candidate, Ordering::Release);
        Ok(())
    }

    /// Moves the value at `first` out and frees its slot.
    ///
    /// # Safety
    ///
    /// Only one thread may act as consumer at a time.
    #[inline]
    pub(super) unsafe fn pop(&self) -> Option<T> {
        let first = self.load_first();
        let next_write = self.load_next_write();
        if first == next_write {
            return None;
        }

        // SAFETY: first is in [first, next_write); the acquire load of
        // next_write makes the producer's write of this slot visible.
        let value = self.buffer[first].with(|slot| unsafe { (*slot).assume_init_read() });
        // Release orders the read before the producer may reuse the slot.
        self.first.store(self.advance(first), Ordering::Release);
        Some(value)
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Sole owner; Relaxed is enough.
        let mut i = self.first.load(Ordering::Relaxed);
        let next_write = self.next_write.load(Ordering::Relaxed);

        while i != next_write {
            // SAFETY: slots in [first, next_write) hold initialized values.
            self.buffer[i].with_mut(|slot| unsafe { (*slot).assume_init_drop() });
            i = self.advance(i);
        }
    }
}
