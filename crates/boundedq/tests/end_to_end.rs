//! End-to-end scenarios exercising the queues across real threads.

use boundedq::{BlockingQueue, Consumer, MpRing, SpRing, WorkerConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A producer fills the queue ahead of a delayed consumer, then the roles
/// interleave with the consumer pacing the producer.
#[test]
fn blocking_queue_producer_ahead_then_paced() {
    let queue = Arc::new(BlockingQueue::with_capacity(10));

    // Phase 1: fill 0..10 before the consumer starts.
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..10 {
                queue.push(i);
            }
        })
    };
    producer.join().unwrap();

    thread::sleep(Duration::from_millis(100));
    for i in 0..10 {
        assert_eq!(queue.pop(), i);
    }
    assert!(queue.is_empty());

    // Phase 2: five more blocking pushes with the consumer popping slowly.
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..5 {
                queue.push(i);
            }
        })
    };

    for i in 0..5 {
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.pop(), i);
    }
    producer.join().unwrap();
    assert!(queue.is_empty());
}

/// Timed pop fails on an empty queue, then sees a value pushed concurrently.
#[test]
fn blocking_queue_timed_pop_both_outcomes() {
    let queue = Arc::new(BlockingQueue::<u32>::with_capacity(10));

    assert_eq!(queue.pop_timeout(Duration::from_millis(100)), None);

    let pusher = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            queue.push(42);
        })
    };

    assert_eq!(queue.pop_timeout(Duration::from_secs(1)), Some(42));
    pusher.join().unwrap();
}

/// Single-producer ring keeps strict FIFO under real producer/consumer
/// concurrency.
#[test]
fn sp_ring_fifo_across_threads() {
    const ITEMS: u64 = 100_000;

    let ring = Arc::new(SpRing::<u64, 64>::new());

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            for i in 0..ITEMS {
                while !ring.push(i) {
                    thread::yield_now();
                }
            }
        })
    };

    let mut expected = 0;
    while expected < ITEMS {
        if let Some(value) = ring.pop() {
            assert_eq!(value, expected);
            expected += 1;
        } else {
            thread::yield_now();
        }
    }

    producer.join().unwrap();
    assert_eq!(ring.pop(), None);
}

/// Three producers, three consumers over one multi-producer ring: the
/// combined popped multiset matches what was pushed, and each consumer's
/// local view preserves per-producer order.
#[test]
fn mp_ring_three_producers_three_consumers() {
    const PRODUCERS: usize = 3;
    const CONSUMERS: usize = 3;
    const PER_PRODUCER: u64 = 5;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER as usize;

    let ring = Arc::new(MpRing::<(usize, u64), 16>::new());
    let popped = Arc::new(AtomicUsize::new(0));

    let mut consumers = Vec::new();
    for _ in 0..CONSUMERS {
        let ring = Arc::clone(&ring);
        let popped = Arc::clone(&popped);
        consumers.push(thread::spawn(move || {
            let mut local = Vec::new();
            while popped.load(Ordering::Acquire) < TOTAL {
                if let Some(pair) = ring.pop() {
                    popped.fetch_add(1, Ordering::AcqRel);
                    local.push(pair);
                } else {
                    thread::yield_now();
                }
            }
            local
        }));
    }

    let mut producers = Vec::new();
    for id in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        producers.push(thread::spawn(move || {
            for value in 0..PER_PRODUCER {
                while !ring.push((id, value)) {
                    thread::yield_now();
                }
            }
        }));
    }

    for handle in producers {
        handle.join().unwrap();
    }

    let mut all = Vec::new();
    for handle in consumers {
        let local = handle.join().unwrap();

        // Within one consumer's view, each producer's values must ascend.
        let mut last = [None::<u64>; PRODUCERS];
        for &(id, value) in &local {
            if let Some(prev) = last[id] {
                assert!(prev < value, "producer {} reordered: {} before {}", id, prev, value);
            }
            last[id] = Some(value);
        }
        all.extend(local);
    }

    // Conservation: {0..5} from each of the three producers, exactly once.
    assert_eq!(all.len(), TOTAL);
    all.sort_unstable();
    let mut expected = Vec::new();
    for id in 0..PRODUCERS {
        for value in 0..PER_PRODUCER {
            expected.push((id, value));
        }
    }
    assert_eq!(all, expected);
    assert_eq!(ring.pop(), None);
}

/// Worker lifecycle: init once, every successful produce either consumed or
/// discarded at shutdown, nothing after join.
#[test]
fn consumer_worker_lifecycle() {
    let init_count = Arc::new(AtomicUsize::new(0));
    let consumed = Arc::new(AtomicUsize::new(0));

    let mut worker = {
        let init_count = Arc::clone(&init_count);
        let consumed = Arc::clone(&consumed);
        Consumer::with_init(
            WorkerConfig::default(),
            move |_item: u32| {
                consumed.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                init_count.fetch_add(1, Ordering::SeqCst);
            },
        )
    };

    let mut accepted = 0;
    for i in 1..=100 {
        if worker.produce(i) {
            accepted += 1;
        }
    }
    worker.join().unwrap();

    assert_eq!(init_count.load(Ordering::SeqCst), 1);
    let after_join = consumed.load(Ordering::SeqCst);
    assert!(after_join <= accepted);

    thread::sleep(Duration::from_millis(20));
    assert_eq!(consumed.load(Ordering::SeqCst), after_join, "handler ran after join");
}

/// Draining shutdown delivers every queued item before stopping.
#[test]
fn consumer_worker_drains_on_request() {
    let sum = Arc::new(AtomicUsize::new(0));

    let mut worker = {
        let sum = Arc::clone(&sum);
        Consumer::with_config(WorkerConfig::new(8), move |item: usize| {
            sum.fetch_add(item, Ordering::SeqCst);
        })
    };

    for i in 1..=100 {
        worker.produce_or_block(i);
    }
    worker.drain_and_join().unwrap();

    assert_eq!(sum.load(Ordering::SeqCst), 5050);
}

/// Heavier mixed load: eight producers through one multi-producer ring with
/// a single draining consumer, checksummed.
#[test]
fn mp_ring_stress_checksum() {
    const PRODUCERS: u64 = 8;
    const PER_PRODUCER: u64 = 50_000;

    let ring = Arc::new(MpRing::<u64, 1024>::new());

    let mut handles = Vec::new();
    for _ in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                while !ring.push(i) {
                    thread::yield_now();
                }
            }
        }));
    }

    let mut total = 0u64;
    let mut sum = 0u64;
    while total < PRODUCERS * PER_PRODUCER {
        if let Some(value) = ring.pop() {
            sum += value;
            total += 1;
        } else {
            thread::yield_now();
        }
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (0..PER_PRODUCER).sum::<u64>() * PRODUCERS;
    assert_eq!(sum, expected);
    assert_eq!(ring.pop(), None);
}
