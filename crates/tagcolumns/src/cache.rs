//! Cache stores backing script columns and cached sort adapters.
//!
//! Two stores cover the two kinds of rows:
//!
//! - [`WeakKeyCache`] for items that carry an [`ItemAnchor`]. Entries hold
//!   only a [`WeakAnchor`] and stop matching once the item is dropped.
//! - [`IdentityFifoCache`] for items identified by a host row id, bounded
//!   with first-in first-out eviction.
//!
//! | Operation | WeakKeyCache       | IdentityFifoCache |
//! |-----------|--------------------|-------------------|
//! | `get`     | O(1)               | O(1)              |
//! | `insert`  | O(1) amortized     | O(1) amortized    |
//! | `remove`  | O(1)               | O(n)              |
//!
//! Neither store is thread-safe; owners wrap them in a `RefCell`.

use std::collections::{HashMap, VecDeque};

use crate::item::{ItemAnchor, WeakAnchor};

const MIN_SWEEP_THRESHOLD: usize = 64;

/// Map from live items to values, keyed by anchor.
///
/// A dead entry keeps its anchor allocation reserved, so its key can never
/// be handed to a different item while the entry exists. Dead entries are
/// swept when the map doubles in size.
#[derive(Debug)]
pub struct WeakKeyCache<V> {
    entries: HashMap<usize, (WeakAnchor, V)>,
    sweep_at: usize,
}

impl<V> WeakKeyCache<V> {
    pub fn new() -> Self {
        WeakKeyCache {
            entries: HashMap::new(),
            sweep_at: MIN_SWEEP_THRESHOLD,
        }
    }

    /// Returns the value cached for a live anchor.
    pub fn get(&self, anchor: &ItemAnchor) -> Option<&V> {
        self.entries
            .get(&anchor.key())
            .filter(|(weak, _)| weak.is_alive())
            .map(|(_, value)| value)
    }

    /// Caches a value, replacing any previous one for the anchor.
    pub fn insert(&mut self, anchor: &ItemAnchor, value: V) {
        if self.entries.len() >= self.sweep_at {
            self.purge_dead();
            self.sweep_at = (self.entries.len() * 2).max(MIN_SWEEP_THRESHOLD);
        }
        self.entries
            .insert(anchor.key(), (anchor.downgrade(), value));
    }

    /// Removes the value cached for an anchor.
    pub fn remove(&mut self, anchor: &ItemAnchor) -> Option<V> {
        self.entries.remove(&anchor.key()).map(|(_, value)| value)
    }

    /// Drops entries whose item is gone.
    pub fn purge_dead(&mut self) {
        self.entries.retain(|_, (weak, _)| weak.is_alive());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.sweep_at = MIN_SWEEP_THRESHOLD;
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(weak, _)| weak.is_alive())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for WeakKeyCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded map from row id to value with FIFO eviction.
///
/// Updating an existing key keeps its original position; reads never
/// reorder. Inserting past capacity evicts the oldest inserted key.
#[derive(Debug)]
pub struct IdentityFifoCache<V> {
    map: HashMap<u64, V>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl<V> IdentityFifoCache<V> {
    /// Creates a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        IdentityFifoCache {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, id: u64) -> Option<&V> {
        self.map.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.map.contains_key(&id)
    }

    /// Inserts a value, returning the evicted `(id, value)` if any.
    pub fn insert(&mut self, id: u64, value: V) -> Option<(u64, V)> {
        if let Some(slot) = self.map.get_mut(&id) {
            *slot = value;
            return None;
        }
        self.map.insert(id, value);
        self.order.push_back(id);
        if self.map.len() > self.capacity {
            let oldest = self.order.pop_front()?;
            return self.map.remove(&oldest).map(|evicted| (oldest, evicted));
        }
        None
    }

    pub fn remove(&mut self, id: u64) -> Option<V> {
        let value = self.map.remove(&id)?;
        self.order.retain(|queued| *queued != id);
        Some(value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_cache_hits_while_anchor_lives() {
        let anchor = ItemAnchor::new();
        let mut cache = WeakKeyCache::new();
        cache.insert(&anchor, "value".to_string());
        assert_eq!(cache.get(&anchor).map(String::as_str), Some("value"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn weak_cache_forgets_dropped_items() {
        let mut cache = WeakKeyCache::new();
        let keep = ItemAnchor::new();
        cache.insert(&keep, 1);
        {
            let gone = ItemAnchor::new();
            cache.insert(&gone, 2);
            assert_eq!(cache.len(), 2);
        }
        assert_eq!(cache.len(), 1);
        cache.purge_dead();
        assert_eq!(cache.entries.len(), 1);
    }

    #[test]
    fn weak_cache_sweeps_when_growing() {
        let mut cache = WeakKeyCache::new();
        for i in 0..(MIN_SWEEP_THRESHOLD * 3) {
            let transient = ItemAnchor::new();
            cache.insert(&transient, i);
        }
        assert!(cache.entries.len() <= MIN_SWEEP_THRESHOLD + 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn weak_cache_remove_and_clear() {
        let a = ItemAnchor::new();
        let b = ItemAnchor::new();
        let mut cache = WeakKeyCache::new();
        cache.insert(&a, 'a');
        cache.insert(&b, 'b');
        assert_eq!(cache.remove(&a), Some('a'));
        assert_eq!(cache.get(&a), None);
        assert_eq!(cache.get(&b), Some(&'b'));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn fifo_evicts_oldest_insertion() {
        let mut cache = IdentityFifoCache::new(2);
        assert_eq!(cache.insert(1, "one"), None);
        assert_eq!(cache.insert(2, "two"), None);
        // reads do not refresh position
        assert_eq!(cache.get(1), Some(&"one"));
        assert_eq!(cache.insert(3, "three"), Some((1, "one")));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn fifo_update_keeps_position() {
        let mut cache = IdentityFifoCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11);
        assert_eq!(cache.get(1), Some(&11));
        assert_eq!(cache.insert(3, 30), Some((1, 11)));
    }

    #[test]
    fn fifo_remove_and_capacity_floor() {
        let mut cache = IdentityFifoCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(7, ());
        assert_eq!(cache.remove(7), Some(()));
        assert!(cache.is_empty());
        cache.insert(8, ());
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
