use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned by [`BlockingQueue::try_push`] when the queue is at
/// capacity. Carries the rejected value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is full")]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Returns the value that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
}

/// Bounded FIFO queue with blocking push/pop semantics.
///
/// One mutex guards the item sequence; one condition variable carries both
/// "no longer empty" and "no longer full" signals. Waiters always broadcast
/// on a boundary transition (empty→non-empty, full→non-full) and re-check
/// their predicate under the lock, so spurious wakeups are harmless.
///
/// The capacity is a bound, not a preallocation: the default of `usize::MAX`
/// costs nothing until items are actually queued.
///
/// A poisoned mutex is recovered transparently, so a panic in an unrelated
/// thread never wedges the queue and `push` genuinely cannot fail.
pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    signal: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Creates a queue bounded only by `usize::MAX`.
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                capacity,
            }),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Inner<T>>) -> MutexGuard<'a, Inner<T>> {
        match self.signal.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, Inner<T>>,
        duration: Duration,
    ) -> (MutexGuard<'a, Inner<T>>, bool) {
        match self.signal.wait_timeout(guard, duration) {
            Ok((guard, result)) => (guard, result.timed_out()),
            Err(poisoned) => {
                let (guard, result) = poisoned.into_inner();
                (guard, result.timed_out())
            }
        }
    }

    /// Returns `true` when the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Returns the current item count.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns the maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Appends `value`, blocking while the queue is at capacity.
    ///
    /// Returns once the value is stored; never fails. Progress requires some
    /// other thread to pop when the queue is full.
    pub fn push(&self, value: T) {
        let mut guard = self.lock();
        while guard.items.len() == guard.capacity {
            guard = self.wait(guard);
        }
        let was_empty = guard.items.is_empty();
        guard.items.push_back(value);
        drop(guard);
        if was_empty {
            self.signal.notify_all();
        }
    }

    /// Appends `value` if space is available, without blocking.
    pub fn try_push(&self, value: T) -> Result<(), QueueFull<T>> {
        let mut guard = self.lock();
        if guard.items.len() == guard.capacity {
            return Err(QueueFull(value));
        }
        let was_empty = guard.items.is_empty();
        guard.items.push_back(value);
        drop(guard);
        if was_empty {
            self.signal.notify_all();
        }
        Ok(())
    }

    /// Removes the front item, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let mut guard = self.lock();
        loop {
            if let Some(value) = guard.items.pop_front() {
                let was_full = guard.items.len() + 1 == guard.capacity;
                drop(guard);
                if was_full {
                    self.signal.notify_all();
                }
                return value;
            }
            guard = self.wait(guard);
        }
    }

    /// Removes the front item if one is present, without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut guard = self.lock();
        let value = guard.items.pop_front()?;
        let was_full = guard.items.len() + 1 == guard.capacity;
        drop(guard);
        if was_full {
            self.signal.notify_all();
        }
        Some(value)
    }

    /// Removes the front item, blocking for at most `timeout`.
    ///
    /// The deadline is computed once from a monotonic clock; the wait loop
    /// re-checks the predicate after every wakeup, so `None` always means
    /// the deadline passed while the queue was empty — and in that case the
    /// queue state is untouched by the call.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lock();
        loop {
            if let Some(value) = guard.items.pop_front() {
                let was_full = guard.items.len() + 1 == guard.capacity;
                drop(guard);
                if was_full {
                    self.signal.notify_all();
                }
                return Some(value);
            }

            let remaining = deadline
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::MAX);
            if remaining.is_zero() {
                return None;
            }

            let (g, timed_out) = self.wait_timeout(guard, remaining);
            guard = g;
            if timed_out && guard.items.is_empty() {
                return None;
            }
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn zero_capacity_panics() {
        let _ = BlockingQueue::<u32>::with_capacity(0);
    }

    #[test]
    fn fifo_round_trip() {
        let queue = BlockingQueue::with_capacity(4);
        for i in 0..4 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 4);
        for i in 0..4 {
            assert_eq!(queue.try_pop(), Some(i));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn try_push_full_returns_value() {
        let queue = BlockingQueue::with_capacity(1);
        assert!(queue.try_push(10).is_ok());
        assert_eq!(queue.try_push(11), Err(QueueFull(11)));
        assert_eq!(queue.try_push(11).unwrap_err().into_inner(), 11);
        assert_eq!(queue.try_pop(), Some(10));
        assert!(queue.try_push(12).is_ok());
    }

    #[test]
    fn pop_timeout_leaves_queue_untouched() {
        let queue = BlockingQueue::<u32>::with_capacity(4);
        let start = Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(50)), None);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(queue.is_empty());

        queue.push(7);
        assert_eq!(queue.pop_timeout(Duration::from_millis(50)), Some(7));
    }

    #[test]
    fn pop_timeout_sees_concurrent_push() {
        let queue = Arc::new(BlockingQueue::<u32>::new());

        let pusher = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                queue.push(42);
            })
        };

        assert_eq!(queue.pop_timeout(Duration::from_secs(2)), Some(42));
        pusher.join().unwrap();
    }

    #[test]
    fn push_blocks_until_space() {
        let queue = Arc::new(BlockingQueue::with_capacity(1));
        queue.push(1);

        let blocked = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };

        thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.pop(), 1);
        blocked.join().unwrap();
        assert_eq!(queue.pop(), 2);
    }

    #[test]
    fn pop_blocks_until_item() {
        let queue = Arc::new(BlockingQueue::<u32>::with_capacity(1));

        let blocked = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(30));
        queue.push(9);
        assert_eq!(blocked.join().unwrap(), 9);
    }

    #[test]
    fn broadcast_wakes_multiple_poppers() {
        let queue = Arc::new(BlockingQueue::<u32>::new());
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let queue = Arc::clone(&queue);
            waiters.push(thread::spawn(move || queue.pop_timeout(Duration::from_secs(5))));
        }

        thread::sleep(Duration::from_millis(30));
        for i in 0..3 {
            queue.push(i);
        }

        let mut got: Vec<u32> = waiters
            .into_iter()
            .map(|w| w.join().unwrap().unwrap())
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1, 2]);
    }
}
