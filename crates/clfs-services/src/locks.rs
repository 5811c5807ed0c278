//! Per-object mutual exclusion.
//!
//! Each request holds the lock for its object id from dispatch until the
//! connection is done with the object, so a PUT never interleaves with
//! another PUT, GET or RM on the same id. Requests on different ids never
//! contend. Entries are dropped as soon as nobody holds or waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct ObjectLocks {
    locks: Arc<DashMap<u32, Arc<Mutex<()>>>>,
}

impl ObjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: u32) -> ObjectGuard {
        let mutex = self.locks.entry(id).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        ObjectGuard {
            id,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of ids currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one object id, released on drop.
pub struct ObjectGuard {
    id: u32,
    locks: Arc<DashMap<u32, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ObjectGuard {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for ObjectGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the table's own reference left: nobody holds or waits.
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
