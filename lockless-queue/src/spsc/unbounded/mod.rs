//! Unbounded SPSC queue over a linked list of pooled nodes.
//!
//! `push` never fails. Nodes come from a [`lockless_pool::Pool`] owned by
//! the producer; nodes the consumer has finished with are handed back to the
//! pool by the producer on its next push, so a steady-state queue stops
//! allocating once the pool covers its high-water mark.
//!
//! # Example
//!
//! ```
//! use lockless_queue::UnboundedSpscQueue;
//!
//! let (mut tx, mut rx) = UnboundedSpscQueue::<u64>::with_capacity(4).split();
//!
//! for i in 0..100 {
//!     tx.push(i);
//! }
//! for i in 0..100 {
//!     assert_eq!(rx.pop(), Some(i));
//! }
//! assert!(rx.is_empty());
//! ```
//!
//! # Memory Ordering
//!
//! The producer links the new node with a plain write and then release-stores
//! `tail`; the consumer acquire-loads `tail` before following the link. The
//! consumer release-stores `divider` after moving a value out; the producer
//! acquire-loads `divider` before freeing anything behind it.

mod chain;

use std::fmt;

use chain::Chain;
use lockless_pool::PoolError;

use crate::sync::Arc;

pub use lockless_pool::DEFAULT_CAPACITY;

/// Unbounded lock-free SPSC queue.
///
/// Used directly, every mutating operation takes `&mut self`. Call
/// [`split`](Self::split) to share it between a producer thread and a
/// consumer thread.
pub struct UnboundedSpscQueue<T> {
    chain: Chain<T>,
}

impl<T> UnboundedSpscQueue<T> {
    /// Creates a queue whose node pool grows in steps of [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a queue whose node pool starts with, and grows in steps of,
    /// `capacity` nodes. One node is always held as the list sentinel.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or too large to allocate as one chunk.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(queue) => queue,
            Err(err) => panic!("invalid queue capacity: {err}"),
        }
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Errors
    ///
    /// Returns the pool's [`PoolError`] if `capacity` is zero or overflows.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, PoolError> {
        Ok(Self {
            chain: Chain::new(capacity)?,
        })
    }

    /// Whether the cursor atomics are lock-free on this target.
    #[inline]
    #[must_use]
    pub const fn is_lock_free(&self) -> bool {
        super::cursors_lock_free()
    }

    /// Appends a value. Never fails; may grow the node pool.
    #[inline]
    pub fn push(&mut self, value: T) {
        // SAFETY: &mut self makes us the only producer.
        unsafe { self.chain.push(value) }
    }

    /// Removes the oldest value, or returns `None` if the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: &mut self makes us the only consumer.
        unsafe { self.chain.pop() }
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
        self.chain.is_empty()
    }

    /// Number of queued values. Walks the list.
    #[must_use]
    pub fn len(&self) -> usize {
        // SAFETY: popping needs &mut self, so no consumer runs concurrently.
        unsafe { self.chain.len() }
    }

    /// Nodes currently owned by the pool, in use or free.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        // SAFETY: pushing needs &mut self, so no producer runs concurrently.
        unsafe { self.chain.pool_capacity() }
    }

    /// Splits the queue into its producer and consumer halves.
    ///
    /// Values already queued stay queued. Nodes, the pool, and any values
    /// still queued are released when both halves are gone.
    #[must_use]
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let chain = Arc::new(self.chain);
        (
            Producer {
                chain: Arc::clone(&chain),
            },
            Consumer { chain },
        )
    }
}

impl<T> Default for UnboundedSpscQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for UnboundedSpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedSpscQueue")
            .field("len", &self.len())
            .field("pool_capacity", &self.pool_capacity())
            .finish_non_exhaustive()
    }
}

/// The pushing half of a split [`UnboundedSpscQueue`].
///
/// Owns the node pool. Not `Clone`; `push` takes `&mut self`.
pub struct Producer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Producer<T> {
    /// Appends a value. Never fails and never blocks; growing the pool is
    /// the only operation that can reach the system allocator.
    #[inline]
    pub fn push(&mut self, value: T) {
        // SAFETY: the single Producer is the only caller of Chain::push.
        unsafe { self.chain.push(value) }
    }

    /// Nodes currently owned by the pool, in use or free.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        // SAFETY: the pool belongs to the producer, and we are it.
        unsafe { self.chain.pool_capacity() }
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
            .field("pool_capacity", &self.pool_capacity())
            .finish_non_exhaustive()
    }
}

/// The popping half of a split [`UnboundedSpscQueue`].
///
/// Not `Clone`; `pop` takes `&mut self`.
pub struct Consumer<T> {
    chain: Arc<Chain<T>>,
}

impl<T> Consumer<T> {
    /// Removes the oldest value, or returns `None` if the queue is empty.
    ///
    /// An empty queue is the normal idle state, not an error. Poll again
    /// (with whatever backoff suits the caller) to wait for data.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: the single Consumer is the only caller of Chain::pop.
        unsafe { self.chain.pop() }
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
        self.chain.is_empty()
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
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}
