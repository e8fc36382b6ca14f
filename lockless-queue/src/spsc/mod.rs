//! Single-producer single-consumer (SPSC) queues.
//!
//! Both variants use only acquire/release loads and stores on two cursors:
//!
//! | Queue | Producer publishes | Consumer publishes |
//! |-------|--------------------|--------------------|
//! | [`bounded`] | `next_write` (new values) | `first` (freed slots) |
//! | [`unbounded`] | `tail` (new nodes) | `divider` (consumed nodes) |
//!
//! A queue can be used directly by a single owner, or [split] into a
//! `Producer` and a `Consumer` that can be moved to two different threads.
//!
//! [split]: bounded::BoundedSpscQueue::split

pub mod bounded;
pub mod unbounded;

#[cfg(all(test, loom))]
mod loom_tests;

/// Whether the cursor atomics compile to native lock-free instructions.
#[inline]
pub(crate) const fn cursors_lock_free() -> bool {
    cfg!(target_has_atomic = "ptr")
}
