//! Loom models of both queues.
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test -p lockless-queue --release`.
//! Counts are kept tiny; loom explores every interleaving.
//!
//! Slots, nodes and the producer's pool sit in `loom::cell::UnsafeCell`, so a
//! read of a value that is not ordered after its write (or a reuse of a slot
//! or node not ordered after its last read) fails the model.

use loom::thread;

use super::bounded::BoundedSpscQueue;
use super::unbounded::UnboundedSpscQueue;

// ============================================================================
// Bounded
// ============================================================================

#[test]
fn bounded_fifo_across_threads() {
    loom::model(|| {
        let (mut tx, mut rx) = BoundedSpscQueue::<u32>::new(2).split();

        let producer = thread::spawn(move || {
            for i in 0..3 {
                while tx.push(i).is_err() {
                    thread::yield_now();
                }
            }
        });

        let mut expected = 0;
        while expected < 3 {
            match rx.pop() {
                Some(v) => {
                    assert_eq!(v, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }

        producer.join().unwrap();
        assert!(rx.is_empty());
    });
}

#[test]
fn bounded_drop_with_values_in_flight() {
    loom::model(|| {
        let (mut tx, mut rx) = BoundedSpscQueue::<Box<u32>>::new(3).split();

        let producer = thread::spawn(move || {
            let _ = tx.push(Box::new(1));
            let _ = tx.push(Box::new(2));
        });

        if let Some(v) = rx.pop() {
            assert_eq!(*v, 1);
        }

        producer.join().unwrap();
        drop(rx);
    });
}

#[test]
fn bounded_slot_reuse_after_wrap() {
    loom::model(|| {
        // Two slots: every push after the first reuses a slot just popped.
        let (mut tx, mut rx) = BoundedSpscQueue::<Box<u32>>::new(2).split();

        let consumer = thread::spawn(move || {
            let mut expected = 0;
            while expected < 3 {
                match rx.pop() {
                    Some(v) => {
                        assert_eq!(*v, expected);
                        expected += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        });

        for i in 0..3 {
            let mut value = Box::new(i);
            while let Err(full) = tx.push(value) {
                value = full.into_inner();
                thread::yield_now();
            }
        }

        consumer.join().unwrap();
    });
}

// ============================================================================
// Unbounded
// ============================================================================

#[test]
fn unbounded_fifo_across_threads() {
    loom::model(|| {
        let (mut tx, mut rx) = UnboundedSpscQueue::<u32>::with_capacity(2).split();

        let producer = thread::spawn(move || {
            for i in 0..3 {
                tx.push(i);
            }
        });

        let mut expected = 0;
        while expected < 3 {
            match rx.pop() {
                Some(v) => {
                    assert_eq!(v, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }

        producer.join().unwrap();
        assert!(rx.is_empty());
    });
}

#[test]
fn unbounded_reclaim_races_pop() {
    loom::model(|| {
        let (mut tx, mut rx) = UnboundedSpscQueue::<Box<u32>>::with_capacity(2).split();
        tx.push(Box::new(0));

        let consumer = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..3 {
                if let Some(v) = rx.pop() {
                    seen.push(*v);
                }
            }
            seen
        });

        // Each push frees whatever the consumer has already passed.
        tx.push(Box::new(1));
        tx.push(Box::new(2));

        let seen = consumer.join().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.first().copied(), Some(0));
        drop(tx);
    });
}

#[test]
fn unbounded_node_reuse_across_threads() {
    loom::model(|| {
        // One chunk of two nodes: the producer can only keep pushing without
        // growing by reusing nodes the consumer has passed.
        let (mut tx, mut rx) = UnboundedSpscQueue::<Box<u32>>::with_capacity(2).split();

        let consumer = thread::spawn(move || {
            let mut expected = 0;
            while expected < 3 {
                match rx.pop() {
                    Some(v) => {
                        assert_eq!(*v, expected);
                        expected += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        });

        for i in 0..3 {
            tx.push(Box::new(i));
        }

        consumer.join().unwrap();
        assert!(tx.pool_capacity() >= 2);
    });
}
