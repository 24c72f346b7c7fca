// src/core/cache.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A small fixed-capacity map whose entries expire a fixed time after insertion.
///
/// Safe to share between worker tasks: every operation takes a short exclusive
/// lock and never holds it across an `.await`. Entries are independent, so
/// concurrent writers for the same key simply race and the last write wins.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value for `key` if it was inserted less than `ttl` ago.
    /// An expired entry is dropped on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let fresh = match entries.get(key) {
            Some((inserted_at, value)) if inserted_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => None,
            None => return None,
        };
        if fresh.is_none() {
            entries.remove(key);
        }
        fresh
    }

    /// Stores `value`, overwriting whatever was there. When full, expired entries
    /// go first, then the oldest one.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, (inserted_at, _)| inserted_at.elapsed() < ttl);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, (inserted_at, _))| *inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, (Instant::now(), value));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, (Instant, V)>> {
        // A panicking writer cannot leave an entry half-written, so a poisoned
        // lock still guards consistent data.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
