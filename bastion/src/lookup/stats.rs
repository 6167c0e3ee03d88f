use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters, updated lock-free by every resolver.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
    expired_evictions: AtomicU64,
    usage_evictions: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_eviction(&self) {
        self.expired_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_usage_eviction(&self) {
        self.usage_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, size: usize, capacity: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            usage_evictions: self.usage_evictions.load(Ordering::Relaxed),
            size,
            capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Lookups for identities with no entry at all.
    pub misses: u64,
    /// Lookups that replaced a stale entry.
    pub refreshes: u64,
    pub failures: u64,
    pub expired_evictions: u64,
    pub usage_evictions: u64,
    pub size: usize,
    pub capacity: usize,
}
