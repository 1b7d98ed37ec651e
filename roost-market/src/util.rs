use std::{hash::Hash, sync::Arc};

use dashmap::DashMap;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::sync::Mutex;

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// Async mutexes keyed by entity id. Callers that hold the lock for a key
/// are serialized against each other; different keys never contend.
pub struct KeyedLocks<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Returns the lock for the given key, creating it on first use.
    /// Locks are kept for the lifetime of the map.
    pub fn get(&self, key: K) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().value().clone()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
