use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Key → last-seen timestamp, with TTL expiry and a hard size bound.
///
/// Expired entries are dropped lazily: on lookup of that key, and wholesale
/// when an insert finds the cache full. If it is still full after that, the
/// oldest entry is evicted.
#[derive(Debug)]
pub struct TimedCache<K> {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> TimedCache<K> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { ttl, capacity: capacity.max(1), entries: HashMap::new() }
    }

    /// Whether `key` was recorded less than one TTL before `now`.
    pub fn is_fresh(&mut self, key: &K, now: Instant) -> bool {
        match self.entries.get(key) {
            Some(at) if now.saturating_duration_since(*at) < self.ttl => true,
            Some(_) => {
                self.entries.remove(key);
                false
            }
            None => false,
        }
    }

    pub fn insert(&mut self, key: K, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired(now);
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert(key, now);
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| keep(k));
    }

    pub fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries.retain(|_, at| now.saturating_duration_since(*at) < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, at)| **at)
            .map(|(k, _)| k.clone());
        if let Some(k) = oldest {
            self.entries.remove(&k);
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
