use std::time::Duration;

/// Configuration for [`Consumer`](crate::Consumer).
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Maximum number of queued items before `produce` reports full.
    pub capacity: usize,
    /// How long the worker waits for an item before re-checking the stop
    /// flag. Also the stop-latency bound (plus one handler call).
    pub poll_interval: Duration,
}

impl WorkerConfig {
    /// Default worker poll interval (1 ms).
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Creates a configuration with the given queue capacity.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for WorkerConfig {
    /// Unbounded in practice: the queue capacity defaults to `usize::MAX`.
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}
