//! Bounded SPSC queue over a fixed circular buffer.
//!
//! The queue is built with a total number of slots `N`. One slot is always
//! left empty so that equal cursors mean "empty" and adjacent cursors mean
//! "full" without a shared counter; `N - 1` values fit.
//!
//! # Example
//!
//! ```
//! use lockless_queue::BoundedSpscQueue;
//!
//! let mut queue = BoundedSpscQueue::<u32>::new(4);
//! assert_eq!(queue.capacity(), 3);
//!
//! queue.push(1).unwrap();
//! queue.push(2).unwrap();
//! queue.push(3).unwrap();
//! assert!(queue.is_full());
//! assert!(queue.push(4).is_err());
//!
//! assert_eq!(queue.pop(), Some(1));
//! assert!(queue.push(4).is_ok());
//! ```
//!
//! # Threads
//!
//! [`split`](BoundedSpscQueue::split) hands out a [`Producer`] and a
//! [`Consumer`]. Only the producer can push or ask [`is_full`](Producer::is_full);
//! only the consumer can pop or ask [`is_empty`](Consumer::is_empty).
//!
//! # Memory Ordering
//!
//! `push` writes the slot and then publishes with a release store of
//! `next_write`. `pop` acquire-loads `next_write` before reading the slot,
//! then releases the slot with a release store of `first`. The release store
//! of the cursor is the only publish point for a slot's value; the slots
//! themselves are plain memory.

mod ring;

use std::fmt;

use ring::Ring;

use crate::sync::Arc;

/// Slots used by [`BoundedSpscQueue::default`]; 15 values fit.
pub const DEFAULT_SLOTS: usize = 16;

/// Bounded lock-free SPSC queue.
///
/// Used directly, every operation takes `&mut self` and the queue behaves
/// like a plain FIFO. Call [`split`](Self::split) to share it between a
/// producer thread and a consumer thread.
pub struct BoundedSpscQueue<T> {
    ring: Ring<T>,
}

impl<T> BoundedSpscQueue<T> {
    /// Creates a queue with `slots` total buffer slots, of which
    /// `slots - 1` are usable.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is less than 2.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            ring: Ring::new(slots),
        }
    }

    /// Number of values the queue can hold (`slots - 1`).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Total buffer slots, including the one kept empty.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> usize {
        self.ring.slots()
    }

    /// Whether the cursor atomics are lock-free on this target.
    #[inline]
    #[must_use]
    pub const fn is_lock_free(&self) -> bool {
        super::cursors_lock_free()
    }

    /// Appends a value.
    ///
    /// # Errors
    ///
    /// Returns [`Full`] with the value if `capacity()` values are queued.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: &mut self makes us the only producer.
        unsafe { self.ring.push(value) }
    }

    /// Removes the oldest value, or returns `None` if the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: &mut self makes us the only consumer.
        unsafe { self.ring.pop() }
    }

    /// Pops into `out`. Returns `false` and leaves `out` untouched if empty.
    #[inline]
    pub fn pop_into(&mut self, out: &mut T) -> bool {
        match self.pop() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Returns `true` if no values are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Returns `true` if `capacity()` values are queued.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of queued values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Splits the queue into its producer and consumer halves.
    ///
    /// Values already queued stay queued. The buffer is freed, and any
    /// values left in it dropped, when both halves are gone.
    #[must_use]
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let ring = Arc::new(self.ring);
        (
            Producer {
                ring: Arc::clone(&ring),
            },
            Consumer { ring },
        )
    }
}

impl<T> Default for BoundedSpscQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS)
    }
}

impl<T> fmt::Debug for BoundedSpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedSpscQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// The pushing half of a split [`BoundedSpscQueue`].
///
/// Not `Clone`; `push` takes `&mut self`, so there is exactly one producer.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

#[allow(clippy::len_without_is_empty)]
impl<T> Producer<T> {
    /// Appends a value.
    ///
    /// # Errors
    ///
    /// Returns [`Full`] with the value if the queue is full. The queue never
    /// blocks or grows; retry or drop the value.
    ///
    /// # Example
    ///
    /// ```
    /// use lockless_queue::BoundedSpscQueue;
    ///
    /// let (mut tx, _rx) = BoundedSpscQueue::<u32>::new(3).split();
    ///
    /// assert!(tx.push(1).is_ok());
    /// assert!(tx.push(2).is_ok());
    /// assert_eq!(tx.push(3).unwrap_err().into_inner(), 3);
    /// ```
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: the single Producer is the only caller of Ring::push.
        unsafe { self.ring.push(value) }
    }

    /// Returns `true` if the queue is full.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of values the queue can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Snapshot of the number of queued values; may be stale immediately.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the cursor atomics are lock-free on this target.
    #[inline]
    #[must_use]
    pub const fn is_lock_free(&self) -> bool {
        super::cursors_lock_free()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// The popping half of a split [`BoundedSpscQueue`].
///
/// Not `Clone`; `pop` takes `&mut self`, so there is exactly one consumer.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Removes the oldest value, or returns `None` if the queue is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use lockless_queue::BoundedSpscQueue;
    ///
    /// let (mut tx, mut rx) = BoundedSpscQueue::<u32>::new(8).split();
    ///
    /// assert_eq!(rx.pop(), None);
    /// tx.push(42).unwrap();
    /// assert_eq!(rx.pop(), Some(42));
    /// ```
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: the single Consumer is the only caller of Ring::pop.
        unsafe { self.ring.pop() }
    }

    /// Pops into `out`. Returns `false` and leaves `out` untouched if empty.
    #[inline]
    pub fn pop_into(&mut self, out: &mut T) -> bool {
        match self.pop() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Returns `true` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of values the queue can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Snapshot of the number of queued values; may be stale immediately.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the cursor atomics are lock-free on this target.
    #[inline]
    #[must_use]
    pub const fn is_lock_free(&self) -> bool {
        super::cursors_lock_free()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

/// Error returned when the bounded queue is full.
///
/// Contains the value that could not be pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the value that could not be pushed.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T: fmt::Debug> std::error::Error for Full<T> {}
