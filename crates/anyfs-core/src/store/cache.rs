//! Decoded object caching.
//!
//! The cache maps object ids to the most recently known decoded object. It
//! spares repeated decrypt/parse work and makes back-to-back reads inside one
//! access window consistent.
//!
//! Entries are never evicted: ids are never reused by a provider, so a stale
//! entry for a deleted object can never be observed through a live reference.
//! All reads hand out owned clones so that callers mutating a result cannot
//! corrupt the cached value or another caller's view.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::object::{ObjectId, StoredObject};

/// Thread-safe cache of decoded objects, scoped to one filesystem instance.
///
/// Mutual exclusion between writers and readers comes from the access
/// scheduler; the `DashMap` only makes concurrent readers safe.
#[derive(Debug, Default)]
pub struct ObjectCache {
    objects: DashMap<ObjectId, StoredObject>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ObjectCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an owned copy of a cached object.
    ///
    /// Returns `None` if the entry is not cached.
    #[inline]
    pub fn get(&self, id: &ObjectId) -> Option<StoredObject> {
        let found = self.objects.get(id).map(|entry| entry.value().clone());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store (or overwrite) the latest known value of an object.
    #[inline]
    pub fn insert(&self, id: ObjectId, object: StoredObject) {
        self.objects.insert(id, object);
    }

    /// Get cache statistics for monitoring and debugging.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.objects.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Clear all cached entries.
    ///
    /// Only safe while no handle is held; used by tests to force provider reads.
    #[cfg(test)]
    pub fn clear(&self) {
        self.objects.clear();
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached objects
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the provider
    pub misses: u64,
}
