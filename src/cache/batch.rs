use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::access_log::{AccessLog, DEFAULT_LOG_CAPACITY};
use super::recency::RecencyIndex;
use super::striped::StripedLock;
use super::{validate_key, Cache, CacheError};

/// Tuning knobs for the background workers. The defaults match the
/// server's production settings; tests shrink them to make eviction
/// settle quickly.
#[derive(Debug, Clone)]
pub struct CacheTuning {
    /// How often the drainer lifts access records into the recency index.
    pub drain_period: Duration,
    /// Delay before the drainer's first tick.
    pub drain_initial_delay: Duration,
    /// How often the evictor checks for pending removals.
    pub evict_period: Duration,
    /// Delay before the evictor's first tick.
    pub evict_initial_delay: Duration,
    /// Number of pending removals required before a batch is applied.
    pub batch_size: usize,
    /// Capacity of the access log; records beyond it are dropped.
    pub log_capacity: usize,
    /// How long `close` waits for each worker before aborting it.
    pub shutdown_timeout: Duration,
}

impl Default for CacheTuning {
    fn default() -> Self {
        Self {
            drain_period: Duration::from_millis(10),
            drain_initial_delay: Duration::from_millis(1),
            evict_period: Duration::from_millis(10),
            evict_initial_delay: Duration::from_millis(10),
            batch_size: 500,
            log_capacity: DEFAULT_LOG_CAPACITY,
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

/// State shared between the hot path and the two workers.
struct Shared {
    capacity: usize,
    /// Primary store. Entries are added by `put` and removed by the
    /// evictor through `delete`.
    data: DashMap<String, Bytes>,
    /// Striped lock gating per-key access to `data`.
    lock: StripedLock,
    /// Lock-free log of touched keys, drained by the drainer.
    log: AccessLog,
    /// Recency index, owned by the drainer. A superset of `data` while
    /// evictions are pending.
    index: Mutex<RecencyIndex>,
    /// Keys awaiting removal from `data`.
    removals: Mutex<HashSet<String>>,
}

impl Shared {
    /// One drainer cycle: bulk-drain the access log, replay the records
    /// into the recency index, then trim the index head into the removal
    /// set while it exceeds capacity.
    fn drain_once(&self, staging: &mut Vec<String>) {
        self.log.drain_into(staging);
        if staging.is_empty() {
            return;
        }

        let mut index = self.index.lock();
        for key in staging.drain(..) {
            index.touch(key);
        }

        if index.len() > self.capacity {
            let mut removals = self.removals.lock();
            while index.len() > self.capacity {
                match index.pop_eldest() {
                    Some(victim) => {
                        removals.insert(victim);
                    }
                    None => break,
                }
            }
        }
    }

    /// One evictor cycle: once enough removals have accumulated, delete
    /// them all from the primary store and clear the set. Bin locks are
    /// taken one key at a time inside the removal lock, never two at once.
    fn evict_once(&self, batch_size: usize) {
        let mut removals = self.removals.lock();
        if removals.len() < batch_size {
            return;
        }

        let count = removals.len();
        for key in removals.iter() {
            self.delete(key);
        }
        removals.clear();
        debug!(count, "applied eviction batch");
    }

    fn delete(&self, key: &str) {
        if !self.data.contains_key(key) {
            return;
        }
        debug!(key, "removing");

        let _guard = self.lock.write(key);
        self.data.remove(key);
    }
}

/// An in-memory cache with approximate-LRU eviction.
///
/// Retrieval and storage are thread safe; the implementation makes a best
/// effort to keep the entry count close to `capacity`.
///
/// Recency bookkeeping is decoupled from the hot path: `get` and `put`
/// record the touched key in a bounded lock-free [`AccessLog`] and return
/// immediately (a full log drops the record rather than blocking). A
/// drainer task periodically bulk-drains the log into a [`RecencyIndex`]
/// ordered least-recent first; whenever the index outgrows `capacity`, its
/// eldest keys move to a removal set. An evictor task applies removals in
/// batches, amortizing lock acquisition across many deletes.
///
/// Entries are stored in a [`DashMap`] gated by a [`StripedLock`]: reads
/// take the key's bin read lock, writes and deletes its write lock, so
/// operations on the same key are totally ordered while different bins
/// proceed in parallel. The store may transiently exceed `capacity` by the
/// pending-removal backlog; after a quiet drain-and-evict cycle it settles
/// to at most `capacity + batch_size - 1` entries.
pub struct BatchLruCache {
    shared: Arc<Shared>,
    tuning: CacheTuning,
    shutdown: watch::Sender<bool>,
    drainer: Mutex<Option<JoinHandle<()>>>,
    evictor: Mutex<Option<JoinHandle<()>>>,
}

impl BatchLruCache {
    /// Creates a cache bounded at `capacity` entries with default worker
    /// tuning. Must be called within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_tuning(capacity, CacheTuning::default())
    }

    /// Creates a cache with explicit worker tuning.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `tuning.batch_size` is zero.
    pub fn with_tuning(capacity: usize, tuning: CacheTuning) -> Self {
        assert!(capacity > 0, "capacity must be a positive integer");
        assert!(tuning.batch_size > 0, "batch size must be a positive integer");

        let shared = Arc::new(Shared {
            capacity,
            data: DashMap::new(),
            lock: StripedLock::new(),
            log: AccessLog::new(tuning.log_capacity),
            index: Mutex::new(RecencyIndex::new()),
            removals: Mutex::new(HashSet::new()),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let drainer = tokio::spawn(drain_loop(
            Arc::clone(&shared),
            tuning.clone(),
            shutdown_rx.clone(),
        ));
        let evictor = tokio::spawn(evict_loop(Arc::clone(&shared), tuning.clone(), shutdown_rx));

        Self {
            shared,
            tuning,
            shutdown,
            drainer: Mutex::new(Some(drainer)),
            evictor: Mutex::new(Some(evictor)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of access records dropped because the log was full.
    pub fn dropped_records(&self) -> u64 {
        self.shared.log.dropped()
    }

    /// Stops both workers. Waits up to the shutdown timeout for each, then
    /// force-aborts. Pending removals that were not yet applied stay live
    /// in the store.
    pub async fn close(&self) {
        info!("closing cache");
        let _ = self.shutdown.send(true);

        let drainer = self.drainer.lock().take();
        let evictor = self.evictor.lock().take();
        for (name, handle) in [("drainer", drainer), ("evictor", evictor)] {
            let Some(mut handle) = handle else { continue };
            match timeout(self.tuning.shutdown_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(worker = name, error = %e, "worker terminated abnormally"),
                Err(_) => {
                    warn!(worker = name, "worker did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
        info!("cache stopped");
    }
}

impl Cache for BatchLruCache {
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        validate_key(key)?;
        debug!(key, "retrieving");

        let _guard = self.shared.lock.read(key);
        let value = self.shared.data.get(key).map(|entry| entry.value().clone());
        // Recording only hits keeps negative lookups out of the recency
        // signal.
        if value.is_some() {
            self.shared.log.record(key);
        }
        Ok(value)
    }

    fn put(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        validate_key(key)?;
        debug!(key, "storing");

        let _guard = self.shared.lock.write(key);
        self.shared.data.insert(key.to_owned(), value);
        self.shared.log.record(key);
        Ok(())
    }

    fn len(&self) -> usize {
        self.shared.data.len()
    }
}

impl Drop for BatchLruCache {
    fn drop(&mut self) {
        if let Some(handle) = self.drainer.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.evictor.get_mut().take() {
            handle.abort();
        }
    }
}

async fn drain_loop(shared: Arc<Shared>, tuning: CacheTuning, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + tuning.drain_initial_delay, tuning.drain_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut staging = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if catch_unwind(AssertUnwindSafe(|| shared.drain_once(&mut staging))).is_err() {
                    warn!("drainer tick panicked");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("drainer stopped");
}

async fn evict_loop(shared: Arc<Shared>, tuning: CacheTuning, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + tuning.evict_initial_delay, tuning.evict_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if catch_unwind(AssertUnwindSafe(|| shared.evict_once(tuning.batch_size))).is_err() {
                    warn!("evictor tick panicked");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("evictor stopped");
}
