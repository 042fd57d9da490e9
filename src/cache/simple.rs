use bytes::Bytes;
use dashmap::DashMap;

use super::{validate_key, Cache, CacheError};

/// An unbounded concurrent cache with no eviction. Useful as a plain
/// collaborator in protocol tests.
#[derive(Default)]
pub struct SimpleCache {
    data: DashMap<String, Bytes>,
}

impl SimpleCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for SimpleCache {
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        validate_key(key)?;
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        validate_key(key)?;
        self.data.insert(key.to_owned(), value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
