use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::{validate_key, Cache, CacheError};

struct LruInner {
    data: HashMap<String, Bytes>,
    /// Recency order, least recently used at the front.
    order: VecDeque<String>,
}

impl LruInner {
    fn move_to_back(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_owned());
    }
}

/// An in-memory cache with strict LRU eviction.
///
/// Unlike [`BatchLruCache`](super::BatchLruCache), eviction happens
/// synchronously inside `put`: when the cache is at capacity, the least
/// recently used entry is removed before the new one is inserted, so the
/// entry count never exceeds `capacity`. Both structures live under a
/// single mutex; recency is exact at the cost of serializing every
/// operation.
pub struct EagerLruCache {
    capacity: usize,
    inner: Mutex<LruInner>,
}

impl EagerLruCache {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be a positive integer");
        Self {
            capacity,
            inner: Mutex::new(LruInner {
                data: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Cache for EagerLruCache {
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        validate_key(key)?;

        let mut inner = self.inner.lock();
        let value = inner.data.get(key).cloned();
        if value.is_some() {
            inner.move_to_back(key);
        }
        Ok(value)
    }

    fn put(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        validate_key(key)?;

        let mut inner = self.inner.lock();
        if !inner.data.contains_key(key) && inner.data.len() == self.capacity {
            if let Some(eldest) = inner.order.pop_front() {
                debug!(key = %eldest, "evicting");
                inner.data.remove(&eldest);
            }
        }
        inner.data.insert(key.to_owned(), value);
        inner.move_to_back(key);
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.lock().data.len()
    }
}
