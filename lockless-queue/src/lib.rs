//! # lockless-queue
//!
//! Lock-free single-producer single-consumer (SPSC) queues for the hot path
//! between exactly two threads.
//!
//! ## Queues
//!
//! - [`BoundedSpscQueue`]: circular buffer of a fixed number of slots. One
//!   slot always stays empty, so `slots - 1` values fit. Push fails when full.
//! - [`UnboundedSpscQueue`]: linked list of pooled nodes. Push never fails;
//!   consumed nodes are recycled by the producer through a
//!   [`lockless_pool::Pool`].
//!
//! ## Design Goals
//!
//! - No locks, no compare-and-swap, no spinning inside the queue
//! - Cross-thread visibility only through acquire/release cursor pairs
//! - Each cursor on its own cache line
//! - Thread roles enforced by split [`Producer`](spsc::bounded::Producer) /
//!   [`Consumer`](spsc::bounded::Consumer) handles
//!
//! ## Example
//!
//! ```
//! use lockless_queue::BoundedSpscQueue;
//!
//! let (mut tx, mut rx) = BoundedSpscQueue::<u64>::new(16).split();
//!
//! let producer = std::thread::spawn(move || {
//!     for i in 0..100 {
//!         while tx.push(i).is_err() {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut expected = 0;
//! while expected < 100 {
//!     if let Some(v) = rx.pop() {
//!         assert_eq!(v, expected);
//!         expected += 1;
//!     }
//! }
//! producer.join().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod spsc;
mod sync;

pub use spsc::bounded::{BoundedSpscQueue, Full};
pub use spsc::unbounded::UnboundedSpscQueue;
