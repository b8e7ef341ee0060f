//! Per-profile mutual exclusion.
//!
//! Every read-modify-write of a profile aggregate runs under that
//! profile's lock, so two turns on one profile serialise while turns on
//! different profiles proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use lifesim_core::types::ProfileId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async locks, created on first use.
#[derive(Debug, Default)]
pub struct ProfileLocks {
    locks: DashMap<ProfileId, Arc<Mutex<()>>>,
}

impl ProfileLocks {
    /// Empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Held until the guard drops.
    pub async fn acquire(&self, id: &ProfileId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self.locks.entry(id.clone()).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a profile nobody is waiting on.
    pub fn forget(&self, id: &ProfileId) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of tracked profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no profile is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
