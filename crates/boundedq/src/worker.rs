use crate::{BlockingQueue, WorkerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Dedicated consumer thread draining a [`BlockingQueue`].
///
/// Construction spawns the worker, which runs the init handler once and then
/// loops: a timed pop bounded by the configured poll interval, the consume
/// handler on success, a stop-flag check after every pop return. Stop latency
/// is therefore bounded by the poll interval plus one handler call.
///
/// Both handlers run only on the worker thread. Items still queued when the
/// worker stops are discarded; use [`drain_and_join`](Self::drain_and_join)
/// to empty the queue first.
///
/// Dropping a `Consumer` that was never joined performs the terminal join.
pub struct Consumer<T> {
    queue: Arc<BlockingQueue<T>>,
    stop: Arc<AtomicBool>,
    config: WorkerConfig,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Consumer<T> {
    /// Spawns a worker with the default configuration.
    pub fn new<F>(consume: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::with_init(WorkerConfig::default(), consume, || {})
    }

    /// Spawns a worker with the given configuration.
    pub fn with_config<F>(config: WorkerConfig, consume: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::with_init(config, consume, || {})
    }

    /// Spawns a worker that runs `init` on the worker thread, exactly once,
    /// strictly before the first `consume` call.
    pub fn with_init<F, I>(config: WorkerConfig, mut consume: F, init: I) -> Self
    where
        F: FnMut(T) + Send + 'static,
        I: FnOnce() + Send + 'static,
    {
        let queue = Arc::new(BlockingQueue::with_capacity(config.capacity));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let poll = config.poll_interval;
            thread::spawn(move || {
                init();
                while !stop.load(Ordering::Acquire) {
                    if let Some(item) = queue.pop_timeout(poll) {
                        consume(item);
                    }
                }
            })
        };

        Self {
            queue,
            stop,
            config,
            worker: Some(worker),
        }
    }

    /// Enqueues without blocking. Returns `false` when the queue is at
    /// capacity; the value is dropped in that case.
    pub fn produce(&self, value: T) -> bool {
        self.queue.try_push(value).is_ok()
    }

    /// Enqueues, blocking while the queue is at capacity. Returns only after
    /// the value is queued.
    pub fn produce_or_block(&self, value: T) {
        self.queue.push(value);
    }

    /// Signals the worker to stop and waits for it to exit.
    ///
    /// Items still queued when the worker observes the flag are discarded.
    /// Idempotent: once the handle is cleared, further calls return `Ok(())`.
    /// A panic that escaped a user handler is returned as the `Err` case.
    pub fn join(&mut self) -> thread::Result<()> {
        self.stop.store(true, Ordering::Release);
        match self.worker.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    /// Waits for the queue to drain, then stops the worker.
    ///
    /// Emptiness is observed by polling at the configured interval. The item
    /// being handled when the queue is first seen empty still completes,
    /// because the worker re-checks the stop flag only after the handler
    /// returns.
    pub fn drain_and_join(&mut self) -> thread::Result<()> {
        while self.worker.is_some() && !self.queue.is_empty() {
            thread::sleep(self.config.poll_interval);
        }
        self.join()
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            // A handler panic already unwound the worker thread; there is no
            // useful way to re-raise it from a destructor.
            let _ = handle.join();
        }
    }
}
