//! Key/value storage with pluggable eviction
//!
//! The protocol layer talks to storage through the [`Cache`] trait. Three
//! implementations are provided: [`BatchLruCache`] (approximate LRU with
//! batched background eviction, the one the server runs),
//! [`EagerLruCache`] (strict LRU, evicts synchronously on insert), and
//! [`SimpleCache`] (unbounded, no eviction).

mod access_log;
mod batch;
mod eager;
mod error;
mod recency;
mod simple;
mod striped;

pub use access_log::AccessLog;
pub use batch::{BatchLruCache, CacheTuning};
pub use eager::EagerLruCache;
pub use error::CacheError;
pub use recency::RecencyIndex;
pub use simple::SimpleCache;
pub use striped::StripedLock;

use bytes::Bytes;

/// Maximum allowed key length in bytes.
pub const MAX_KEY_LENGTH: usize = 250;

/// Maximum allowed value size in bytes.
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// An in-memory store for key/value pairs. Eviction policy is
/// implementation specific. Implementations are safe to share across
/// connection tasks.
pub trait Cache: Send + Sync {
    /// Returns the value associated with `key`, or `None` if the cache
    /// does not contain it.
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Current number of entries. May be approximate for implementations
    /// that evict in the background.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey);
    }
    Ok(())
}
