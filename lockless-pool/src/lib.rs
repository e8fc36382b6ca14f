//! # lockless-pool
//!
//! A single-threaded pool of fixed-size, uninitialized cells of `T` backed
//! by a LIFO free list. Built for the producer side of lock-free queues,
//! where a general-purpose allocator call on every push would put an
//! unbounded-latency operation on the hot path.
//!
//! ## Behaviour
//!
//! - Memory is obtained in chunks of a fixed number of cells (the initial
//!   capacity). When the free list runs dry, one more chunk is allocated
//!   inline with the `allocate` call that needed it.
//! - Freed cells go back on the free list and are reused most-recently-freed
//!   first. The pool never shrinks.
//! - Every chunk is released in one pass when the pool is dropped.
//!
//! The pool is not `Sync`: `allocate` and `free` must be called from the
//! thread that currently owns it.
//!
//! ## Example
//!
//! ```
//! use lockless_pool::Pool;
//!
//! let mut pool = Pool::<u64>::with_capacity(4);
//!
//! let cell = pool.allocate();
//! unsafe {
//!     cell.write(42);
//!     assert_eq!(cell.read(), 42);
//!     pool.free(cell);
//! }
//!
//! assert_eq!(pool.available(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod chunk;

use std::alloc::Layout;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use chunk::Chunk;

/// Cells allocated per chunk when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 64;

// =============================================================================
// Errors
// =============================================================================

/// Error during pool construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// Capacity is zero.
    ZeroCapacity,
    /// A chunk of `capacity` cells of `cell_size` bytes, or the free list
    /// tracking them, overflows `isize::MAX`.
    CapacityOverflow {
        /// Requested cells per chunk.
        capacity: usize,
        /// Size of one cell in bytes.
        cell_size: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "capacity cannot be zero"),
            Self::CapacityOverflow {
                capacity,
                cell_size,
            } => write!(
                f,
                "chunk of {capacity} cells of {cell_size} bytes exceeds the maximum allocation size"
            ),
        }
    }
}

impl std::error::Error for PoolError {}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Pool`].
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    capacity: usize,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl PoolBuilder {
    /// Cells in the first chunk, and in every chunk added on growth.
    /// Default: [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn capacity(mut self, cells: usize) -> Self {
        self.capacity = cells;
        self
    }

    /// Build the pool, allocating its first chunk.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroCapacity`] if the capacity is zero and
    /// [`PoolError::CapacityOverflow`] if one chunk, or the free list for
    /// it, cannot be laid out. Zero-sized cells only hit the latter.
    pub fn build<T>(self) -> Result<Pool<T>, PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        if Chunk::<T>::layout(self.capacity).is_none()
            || Pool::<T>::free_list_layout(self.capacity).is_none()
        {
            return Err(PoolError::CapacityOverflow {
                capacity: self.capacity,
                cell_size: mem::size_of::<T>(),
            });
        }

        let mut pool = Pool {
            free: Vec::new(),
            chunks: Vec::new(),
            increment: self.capacity,
            capacity: 0,
        };
        pool.grow();
        Ok(pool)
    }
}

// =============================================================================
// Pool
// =============================================================================

/// Growable free-list pool of uninitialized `T` cells.
///
/// Addresses handed out by [`allocate`](Pool::allocate) stay valid until the
/// pool is dropped, whether or not they have been freed. The pool never
/// reads, writes or drops cell contents.
pub struct Pool<T> {
    /// Free cells, most recently freed on top.
    free: Vec<NonNull<T>>,
    /// Every chunk ever allocated, kept for teardown.
    chunks: Vec<Chunk<T>>,
    /// Cells per chunk, fixed at construction.
    increment: usize,
    /// `chunks.len() * increment`, kept so it is never recomputed unchecked.
    capacity: usize,
}

impl<T> Pool<T> {
    /// Creates a pool with one chunk of `cells` cells.
    ///
    /// # Panics
    ///
    /// Panics if `cells` is zero or a chunk of that many cells overflows.
    /// Use [`PoolBuilder`] to handle those cases as errors.
    #[must_use]
    pub fn with_capacity(cells: usize) -> Self {
        match PoolBuilder::default().capacity(cells).build() {
            Ok(pool) => pool,
            Err(err) => panic!("invalid pool capacity: {err}"),
        }
    }

    /// Takes a cell off the free list, growing by one chunk if it is empty.
    ///
    /// The cell is uninitialized. It stays exclusively owned by the caller
    /// until passed back to [`free`](Pool::free).
    ///
    /// Growth that cannot be satisfied by the system allocator aborts the
    /// process.
    ///
    /// # Panics
    ///
    /// Panics if one more chunk would take the total cell count past what
    /// the free list can address. Only reachable with zero-sized cells.
    #[inline]
    pub fn allocate(&mut self) -> NonNull<T> {
        if let Some(cell) = self.free.pop() {
            return cell;
        }
        self.allocate_slow()
    }

    #[cold]
    fn allocate_slow(&mut self) -> NonNull<T> {
        self.grow();
        match self.free.pop() {
            Some(cell) => cell,
            None => unreachable!("a freshly grown pool has free cells"),
        }
    }

    /// Returns a cell to the free list for reuse.
    ///
    /// Never allocates: the free list always has room for every cell the
    /// pool owns. Any value left in the cell is not dropped.
    ///
    /// # Safety
    ///
    /// `cell` must have come from [`allocate`](Pool::allocate) on this pool
    /// and must not already be free.
    #[inline]
    pub unsafe fn free(&mut self, cell: NonNull<T>) {
        debug_assert!(self.free.len() < self.capacity(), "pool over-freed");
        self.free.push(cell);
    }

    /// Total number of cells owned, free or not.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cells currently on the free list.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of chunks allocated so far.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Cells added by each growth.
    #[inline]
    #[must_use]
    pub const fn increment(&self) -> usize {
        self.increment
    }

    fn free_list_layout(cells: usize) -> Option<Layout> {
        Layout::array::<NonNull<T>>(cells).ok()
    }

    /// Total cells after one more chunk, if the free list can still track them.
    fn next_capacity(&self) -> Option<usize> {
        self.capacity
            .checked_add(self.increment)
            .filter(|&total| Self::free_list_layout(total).is_some())
    }

    /// Allocate one more chunk and push all of its cells onto the free list.
    fn grow(&mut self) {
        let Some(total) = self.next_capacity() else {
            panic!(
                "pool capacity overflow: cannot grow past {} cells",
                self.capacity
            );
        };
        let chunk = Chunk::<T>::alloc(self.increment);

        // Room for every cell the pool will own, so `free` never reallocates.
        self.free.reserve(total - self.free.len());
        // Push in reverse so the first cell of the chunk is handed out first.
        for i in (0..chunk.len()).rev() {
            // SAFETY: i < chunk.len()
            self.free.push(unsafe { chunk.cell(i) });
        }
        self.chunks.push(chunk);
        self.capacity = total;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            chunks = self.chunks.len(),
            increment = self.increment,
            capacity = self.capacity(),
            "pool grew"
        );
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

// The pool only holds raw memory; moving it to another thread moves
// ownership of every cell with it.
unsafe impl<T: Send> Send for Pool<T> {}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("chunks", &self.chunk_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // =========================================================================
    // Builder
    // =========================================================================

    #[test]
    fn builder_default() {
        let pool: Pool<u64> = PoolBuilder::default().build().unwrap();
        assert_eq!(pool.capacity(), DEFAULT_CAPACITY);
        assert_eq!(pool.available(), DEFAULT_CAPACITY);
        assert_eq!(pool.chunk_count(), 1);
    }

    #[test]
    fn builder_zero_capacity_error() {
        let result = PoolBuilder::default().capacity(0).build::<u64>();
        assert_eq!(result.unwrap_err(), PoolError::ZeroCapacity);
    }

    #[test]
    fn builder_overflow_error() {
        let result = PoolBuilder::default().capacity(usize::MAX).build::<u64>();
        assert_eq!(
            result.unwrap_err(),
            PoolError::CapacityOverflow {
                capacity: usize::MAX,
                cell_size: 8,
            }
        );
    }

    #[test]
    fn builder_zero_sized_overflow_error() {
        // The chunk itself is free; the free list tracking it is not.
        let result = PoolBuilder::default().capacity(usize::MAX / 2).build::<()>();
        assert_eq!(
            result.unwrap_err(),
            PoolError::CapacityOverflow {
                capacity: usize::MAX / 2,
                cell_size: 0,
            }
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(PoolError::ZeroCapacity.to_string(), "capacity cannot be zero");
    }

    #[test]
    #[should_panic(expected = "invalid pool capacity")]
    fn with_capacity_zero_panics() {
        let _ = Pool::<u64>::with_capacity(0);
    }

    // =========================================================================
    // Allocate / Free
    // =========================================================================

    #[test]
    fn allocate_hands_out_distinct_cells() {
        let mut pool = Pool::<u64>::with_capacity(8);
        let cells: HashSet<_> = (0..8).map(|_| pool.allocate()).collect();
        assert_eq!(cells.len(), 8);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.chunk_count(), 1);
    }

    #[test]
    fn freed_cell_is_reused_first() {
        let mut pool = Pool::<u64>::with_capacity(4);
        let a = pool.allocate();
        let _b = pool.allocate();

        unsafe { pool.free(a) };
        assert_eq!(pool.allocate(), a);
    }

    #[test]
    fn cells_hold_values() {
        let mut pool = Pool::<String>::with_capacity(2);
        let cell = pool.allocate();
        unsafe {
            cell.write("hello".to_string());
            assert_eq!(cell.as_ref(), "hello");
            drop(cell.read());
            pool.free(cell);
        }
    }

    // =========================================================================
    // Growth
    // =========================================================================

    #[test]
    fn grows_by_fixed_increment() {
        let mut pool = Pool::<u64>::with_capacity(4);

        let cells: Vec<_> = (0..9).map(|_| pool.allocate()).collect();
        assert_eq!(pool.chunk_count(), 3);
        assert_eq!(pool.capacity(), 12);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.increment(), 4);

        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn never_shrinks() {
        let mut pool = Pool::<u64>::with_capacity(2);
        let cells: Vec<_> = (0..6).map(|_| pool.allocate()).collect();
        for cell in cells {
            unsafe { pool.free(cell) };
        }
        assert_eq!(pool.capacity(), 6);
        assert_eq!(pool.available(), 6);
    }

    #[test]
    fn growth_stops_at_free_list_limit() {
        let mut pool = Pool::<()>::with_capacity(4);
        assert_eq!(pool.next_capacity(), Some(8));

        // Pretend the pool already tracks as many cells as a free list can.
        pool.capacity = isize::MAX as usize / mem::size_of::<NonNull<()>>();
        assert_eq!(pool.next_capacity(), None);

        pool.capacity = usize::MAX - 2;
        assert_eq!(pool.next_capacity(), None);
    }

    #[test]
    #[should_panic(expected = "pool capacity overflow")]
    fn growth_past_free_list_limit_panics() {
        let mut pool = Pool::<()>::with_capacity(4);
        pool.capacity = usize::MAX - 2;
        pool.free.clear();
        let _ = pool.allocate();
    }

    #[test]
    fn free_list_has_room_for_every_cell() {
        let mut pool = Pool::<u64>::with_capacity(3);
        for _ in 0..10 {
            let _ = pool.allocate();
            assert!(pool.free.capacity() >= pool.capacity());
        }
    }

    #[test]
    fn no_growth_while_free_cells_remain() {
        let mut pool = Pool::<u64>::with_capacity(4);
        for _ in 0..1000 {
            let cell = pool.allocate();
            unsafe { pool.free(cell) };
        }
        assert_eq!(pool.chunk_count(), 1);
    }

    #[test]
    fn addresses_survive_growth() {
        let mut pool = Pool::<u64>::with_capacity(2);
        let first = pool.allocate();
        unsafe { first.write(7) };

        for _ in 0..100 {
            let _ = pool.allocate();
        }

        assert_eq!(unsafe { first.read() }, 7);
    }

    // =========================================================================
    // Special Types
    // =========================================================================

    #[test]
    fn zero_sized_type() {
        let mut pool = Pool::<()>::with_capacity(4);
        for _ in 0..10 {
            let _ = pool.allocate();
        }
        assert_eq!(pool.chunk_count(), 3);
    }

    #[test]
    fn large_cells() {
        let mut pool = Pool::<[u8; 4096]>::with_capacity(3);
        let cell = pool.allocate();
        unsafe {
            cell.write([0xAB; 4096]);
            assert_eq!(cell.as_ref()[4095], 0xAB);
        }
    }

    #[test]
    fn debug_output() {
        let pool = Pool::<u64>::with_capacity(4);
        let s = format!("{pool:?}");
        assert!(s.contains("capacity: 4"));
    }

    #[test]
    fn pool_is_send() {
        fn assert_send<S: Send>() {}
        assert_send::<Pool<u64>>();
    }
}
