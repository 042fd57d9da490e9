use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

/// Default capacity of the access log.
pub const DEFAULT_LOG_CAPACITY: usize = 1 << 17;

/// Bounded lock-free log of recently touched keys.
///
/// The hot path records a key with a non-blocking push; when the queue is
/// full the record is silently dropped. Losing records under saturation is
/// intentional - the recency signal stays approximate and the hot path
/// never waits. The drainer empties the log in FIFO order on its own
/// schedule.
pub struct AccessLog {
    queue: ArrayQueue<String>,
    dropped: AtomicU64,
}

impl AccessLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
        }
    }

    /// Records an access. Never blocks; drops the record if the log is full.
    pub fn record(&self, key: &str) {
        if self.queue.push(key.to_owned()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drains all currently queued records into `out`, oldest first.
    /// Returns the number of records moved.
    pub fn drain_into(&self, out: &mut Vec<String>) -> usize {
        let mut moved = 0;
        while let Some(key) = self.queue.pop() {
            out.push(key);
            moved += 1;
        }
        moved
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Number of records dropped because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
