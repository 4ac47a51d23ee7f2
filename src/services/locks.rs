use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Advisory locks keyed by resource and provider.
///
/// A booking write holds the locks for every resource and provider it
/// touches from the moment it reads the active bookings until its write
/// lands, so two writers competing for the same slot run one after another.
#[derive(Default)]
pub struct SlotLocks {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

/// Held locks. Dropping it releases them all.
pub struct SlotGuard {
    #[cfg(test)]
    keys: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[cfg(test)]
impl SlotGuard {
    fn keys(&self) -> &[String] {
        &self.keys
    }
}

pub fn resource_key(resource_id: &str) -> String {
    format!("resource:{resource_id}")
}

pub fn provider_key(provider_id: &str) -> String {
    format!("provider:{provider_id}")
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every key, always in sorted order so that overlapping key
    /// sets cannot deadlock. Callers must not hold another `SlotGuard`.
    pub async fn acquire<I>(&self, keys: I) -> SlotGuard
    where
        I: IntoIterator<Item = String>,
    {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        self.prune();

        let mutexes: Vec<Arc<Mutex<()>>> = keys
            .iter()
            .map(|key| Arc::clone(self.slots.entry(key.clone()).or_default().value()))
            .collect();

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        SlotGuard {
            #[cfg(test)]
            keys,
            _guards: guards,
        }
    }

    /// Number of keys currently tracked, held or not.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.len()
    }

    // An entry whose only owner is the map is neither held nor awaited.
    fn prune(&self) {
        self.slots.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }
}
