use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::trace;

use super::Cache;

struct Entry {
    expires_at: Instant,
    value: String,
}

/// In-process cache on a concurrent map. Expired entries are dropped lazily on read;
/// [`MemoryCache::purge_expired`] sweeps the rest so an idle key set cannot grow unbounded.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => None,
            None => return None,
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        trace!("📇️ Cache {} for {key}", if hit.is_some() { "hit" } else { "expired" });
        hit
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(key.to_string(), Entry { expires_at: Instant::now() + ttl, value });
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    fn delete_prefix(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }
}
