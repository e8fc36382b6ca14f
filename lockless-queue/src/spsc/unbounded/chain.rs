//! Node chain behind the unbounded SPSC queue.

use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use crossbeam_utils::CachePadded;
use lockless_pool::{Pool, PoolBuilder, PoolError};

use crate::sync::{AtomicPtr, Ordering, UnsafeCell};

struct Node<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    next: UnsafeCell<*mut Node<T>>,
}

impl<T> Node<T> {
    /// Takes a cell from `pool` and initializes it as an unlinked, empty node.
    fn alloc(pool: &mut Pool<Self>) -> *mut Self {
        let node = pool.allocate().as_ptr();
        // SAFETY: fresh, exclusively owned cell.
        unsafe {
            node.write(Self {
                value: UnsafeCell::new(MaybeUninit::uninit()),
                next: UnsafeCell::new(ptr::null_mut()),
            });
        }
        node
    }
}

/// State only the producer touches.
struct ProducerSide<T> {
    /// Oldest node not yet returned to the pool.
    first: *mut Node<T>,
    pool: Pool<Node<T>>,
}

/// Singly linked chain of pooled nodes.
///
/// ```text
///  first ──► ... ──► divider ──► v1 ──► v2 ──► ... ──► tail
///  └── consumed, producer frees ┘└──── queued values ─────┘
/// ```
///
/// - `[first, divider)`: consumed nodes. Producer-owned; freed on the next push.
/// - `divider`: the last consumed node (or the initial sentinel). Its value
///   has been moved out.
/// - `(divider, tail]`: queued values, oldest first. Consumer-owned values;
///   the producer still owns `tail.next` until it links a new node.
///
/// `tail` is the producer's publish point, `divider` the consumer's. The
/// producer never frees `divider` itself, so the consumer can always read
/// `divider.next`.
pub(super) struct Chain<T> {
    /// Stored only by the consumer.
    divider: CachePadded<AtomicPtr<Node<T>>>,
    /// Stored only by the producer.
    tail: CachePadded<AtomicPtr<Node<T>>>,
    producer: UnsafeCell<ProducerSide<T>>,
}

// Each side writes a disjoint region of the chain; the two atomics are the
// only hand-off points.
unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send> Sync for Chain<T> {}

impl<T> Chain<T> {
    pub(super) fn new(capacity: usize) -> Result<Self, PoolError> {
        let mut pool = PoolBuilder::default().capacity(capacity).build::<Node<T>>()?;
        let sentinel = Node::alloc(&mut pool);

        Ok(Self {
            divider: CachePadded::new(AtomicPtr::new(sentinel)),
            tail: CachePadded::new(AtomicPtr::new(sentinel)),
            producer: UnsafeCell::new(ProducerSide {
                first: sentinel,
                pool,
            }),
        })
    }

    /// Links a node holding `value` after the tail, publishes it, then frees
    /// everything the consumer has finished with.
    ///
    /// # Safety
    ///
    /// Only one thread may act as producer at a time.
    #[inline]
    pub(super) unsafe fn push(&self, value: T) {
        self.producer.with_mut(|side| {
            // SAFETY: caller is the only producer.
            let side = unsafe { &mut *side };

            let node = Node::alloc(&mut side.pool);
            // SAFETY: the node is not reachable from the consumer yet.
            unsafe {
                (*node).value.with_mut(|slot| {
                    (*slot).write(value);
                });
            }

            // Only we store tail.
            let tail = self.tail.load(Ordering::Relaxed);
            // SAFETY: the consumer never reads tail.next before the store below.
            unsafe { (*tail).next.with_mut(|next| *next = node) };
            self.tail.store(node, Ordering::Release);

            self.reclaim(side);
        });
    }

    /// Returns `[first, divider)` to the pool.
    #[inline]
    fn reclaim(&self, side: &mut ProducerSide<T>) {
        let divider = self.divider.load(Ordering::Acquire);
        while side.first != divider {
            let node = side.first;
            // SAFETY: node precedes divider; the consumer is done with it and
            // the acquire above ordered its last reads before this point.
            unsafe {
                // Exclusive claim on both cells before the node is reused.
                (*node).value.with_mut(|_| ());
                side.first = (*node).next.with_mut(|next| *next);
                ptr::drop_in_place(node);
                side.pool.free(NonNull::new_unchecked(node));
            }
        }
    }

    /// Moves out the value after `divider` and advances `divider` to it.
    ///
    /// # Safety
    ///
    /// Only one thread may act as consumer at a time.
    #[inline]
    pub(super) unsafe fn pop(&self) -> Option<T> {
        let divider = self.divider.load(Ordering::Acquire);
        if divider == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: divider != tail, so divider.next was linked before the tail
        // store we acquired, and that node holds an initialized value.
        let value = unsafe {
            let next = (*divider).next.with(|next| *next);
            let value = (*next).value.with(|slot| (*slot).assume_init_read());
            self.divider.store(next, Ordering::Release);
            value
        };
        Some(value)
    }

    #[inline]
    pub(super) fn is_empty(&self) -> bool {
        self.divider.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Counts `(divider, tail]`.
    ///
    /// # Safety
    ///
    /// No consumer may run concurrently.
    pub(super) unsafe fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let mut node = self.divider.load(Ordering::Acquire);
        let mut len = 0;
        while node != tail {
            // SAFETY: nodes up to the acquired tail are linked and live.
            node = unsafe { (*node).next.with(|next| *next) };
            len += 1;
        }
        len
    }

    /// Cells owned by the producer's pool.
    ///
    /// # Safety
    ///
    /// Caller must be the producer.
    pub(super) unsafe fn pool_capacity(&self) -> usize {
        // SAFETY: caller is the producer.
        self.producer.with(|side| unsafe { (*side).pool.capacity() })
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        // Sole owner; Relaxed is enough.
        let divider = self.divider.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: sole owner; every node from first through tail is live and
        // exactly the values in (divider, tail] are initialized.
        self.producer.with_mut(|side| unsafe {
            let side = &mut *side;

            // Drop values still queued.
            let mut node = divider;
            while node != tail {
                node = (*node).next.with(|next| *next);
                (*node).value.with_mut(|slot| (*slot).assume_init_drop());
            }

            // Hand every node back; the pool releases its chunks when dropped.
            let mut node = side.first;
            loop {
                let next = (*node).next.with(|next| *next);
                ptr::drop_in_place(node);
                side.pool.free(NonNull::new_unchecked(node));
                if node == tail {
                    break;
                }
                node = next;
            }
        });
    }
}
