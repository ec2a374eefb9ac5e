//! Time-boxed read-through cache for public translation reads.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

struct Entry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Entries lapse after `ttl`; writers invalidate explicitly.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if now - entry.inserted_at < self.ttl => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: self.clock.now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry whose key matches.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        debug!("Cache invalidated {} entries", before - self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
