use bson::oid::ObjectId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One logical writer per key. Position assignment must be serialized per
/// booth; operations on different booths run fully in parallel, so this is a
/// map of independent async mutexes rather than one global lock.
///
/// Entries are never evicted; a booth's mutex is two pointers, and the set of
/// booths per event is small and bounded.
pub struct KeyedSerializer {
    locks: DashMap<ObjectId, Arc<Mutex<()>>>,
}

impl KeyedSerializer {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn acquire(&self, key: ObjectId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

impl Default for KeyedSerializer {
    fn default() -> Self {
        Self::new()
    }
}
