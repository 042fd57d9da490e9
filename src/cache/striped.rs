use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A read/write lock striped across a fixed number of bins.
///
/// Each key hashes to one bin; operations on keys in different bins do not
/// contend. This serializes per-key store/delete against concurrent reads
/// without a global lock, at the cost of any cross-bin consistency
/// snapshot. The bin count is the CPU count rounded up to a power of two
/// so the hash can be masked.
pub struct StripedLock {
    locks: Vec<RwLock<()>>,
    hasher: RandomState,
}

impl StripedLock {
    pub fn new() -> Self {
        Self::with_bins(default_bins())
    }

    pub fn with_bins(bins: usize) -> Self {
        let bins = bins.max(1).next_power_of_two();
        Self {
            locks: (0..bins).map(|_| RwLock::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    pub fn read(&self, key: &str) -> RwLockReadGuard<'_, ()> {
        self.locks[self.bin(key)].read()
    }

    pub fn write(&self, key: &str) -> RwLockWriteGuard<'_, ()> {
        self.locks[self.bin(key)].write()
    }

    pub fn bins(&self) -> usize {
        self.locks.len()
    }

    pub(crate) fn bin(&self, key: &str) -> usize {
        self.hasher.hash_one(key) as usize & (self.locks.len() - 1)
    }
}

impl Default for StripedLock {
    fn default() -> Self {
        Self::new()
    }
}

fn default_bins() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_rounded_to_power_of_two() {
        assert_eq!(StripedLock::with_bins(1).bins(), 1);
        assert_eq!(StripedLock::with_bins(6).bins(), 8);
        assert_eq!(StripedLock::with_bins(8).bins(), 8);
        assert!(StripedLock::new().bins().is_power_of_two());
    }

    #[test]
    fn test_same_key_same_bin() {
        let lock = StripedLock::with_bins(16);
        assert_eq!(lock.bin("some-key"), lock.bin("some-key"));
    }

    #[test]
    fn test_concurrent_reads_shared() {
        let lock = StripedLock::with_bins(4);
        let a = lock.read("key");
        let b = lock.read("key");
        drop(a);
        drop(b);
    }

    #[test]
    fn test_write_excludes_same_bin() {
        let lock = StripedLock::with_bins(1);
        let guard = lock.write("k1");
        // Single bin, so any other key contends with the held write lock.
        assert!(lock.locks[0].try_read().is_none());
        drop(guard);
        assert!(lock.locks[0].try_read().is_some());
    }
}
