//! Session-scoped keyed caches with FIFO eviction

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A map that forgets its oldest key once `capacity` keys are held.
///
/// `capacity == 0` disables eviction. Entries are never invalidated
/// otherwise: a key stays cached for the session once inserted.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a value. Replacing keeps the key's original age.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = value;
            return;
        }
        self.evict_for_insert();
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Get the value for `key`, inserting `V::default()` if absent
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        if !self.entries.contains_key(&key) {
            self.insert(key.clone(), V::default());
        }
        self.entries.entry(key).or_default()
    }

    fn evict_for_insert(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    tracing::debug!("Evicting oldest cache key");
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}
