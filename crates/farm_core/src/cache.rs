//! Bounded memo cache with first-in-first-out eviction.

use std::collections::VecDeque;
use std::hash::Hash;

use ahash::AHashMap;

#[derive(Debug, Clone)]
pub struct FifoCache<K, V> {
    capacity: usize,
    entries: AHashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> FifoCache<K, V> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: AHashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Inserts `value`, evicting the oldest entry when full. Re-inserting an
    /// existing key replaces the value and keeps its original position.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn get_or_insert_with(&mut self, key: K, build: impl FnOnce() -> V) -> &V {
        if !self.entries.contains_key(&key) {
            let value = build();
            self.insert(key.clone(), value);
        }
        &self.entries[&key]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
