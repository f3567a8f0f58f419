//! Compiled artifact caching
//!
//! Artifacts are reused only while their stored fingerprint equals the one
//! recomputed from current sources. Invalidation just deletes rows; the next
//! request recompiles.

pub mod config;
pub mod fingerprint;
pub mod inflight;
pub mod scope;
pub mod store;

pub use config::CacheConfig;
pub use fingerprint::{Fingerprint, fingerprint};
pub use inflight::CompileLocks;
pub use scope::ScopeIndex;
pub use store::{ArtifactStore, MemoryArtifactStore};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live cache counters
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
    corrupted: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn compiled(&self) {
        self.compiles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn corrupted(&self) {
        self.corrupted.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
        }
    }

    /// Reset every counter to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.compiles.store(0, Ordering::Relaxed);
        self.corrupted.store(0, Ordering::Relaxed);
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a stored artifact
    pub hits: u64,
    /// Requests that found no usable artifact
    pub misses: u64,
    /// Compilations actually run
    pub compiles: u64,
    /// Stored rows that could not be decoded
    pub corrupted: u64,
}

impl CacheStats {
    /// Hit rate between 0.0 and 1.0, or 0.0 if nothing was requested
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, compiles: {}, corrupted: {} (hit rate {:.1}%)",
            self.hits,
            self.misses,
            self.compiles,
            self.corrupted,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = CacheCounters::default();
        counters.hit();
        counters.hit();
        counters.hit();
        counters.miss();
        counters.compiled();

        let stats = counters.snapshot();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.compiles, 1);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(
            stats.to_string(),
            "hits: 3, misses: 1, compiles: 1, corrupted: 0 (hit rate 75.0%)"
        );

        counters.reset();
        assert_eq!(counters.snapshot(), CacheStats::default());
    }
}
