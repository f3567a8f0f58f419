//! Per-key compile serialization

use super::Fingerprint;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

type LockKey = (String, Fingerprint);

/// One mutex per `(view, fingerprint)` being compiled.
///
/// Entries exist only while some caller holds or waits on them.
#[derive(Debug, Default)]
pub struct CompileLocks {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

/// Removes the lock entry once the last user is done, even on unwind
struct Release<'a> {
    locks: &'a CompileLocks,
    key: LockKey,
    lock: Option<Arc<Mutex<()>>>,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl CompileLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock of `(view, fingerprint)`.
    ///
    /// Callers racing on the same key run one after another; callers on
    /// different keys do not block each other.
    pub fn run_exclusive<T>(
        &self,
        view: &str,
        fingerprint: Fingerprint,
        work: impl FnOnce() -> T,
    ) -> T {
        let key = (view.to_string(), fingerprint);
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let release = Release {
            locks: self,
            key,
            lock: Some(lock),
        };

        let result = {
            let _held = release.lock.as_deref().map(|lock| lock.lock());
            work()
        };
        drop(release);
        result
    }

    /// Number of keys currently locked or waited on
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}
