use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

/// Fixed-capacity map that evicts the least recently used entry.
///
/// A successful `try_get` counts as a use; `contains` does not. All operations
/// run under one lock and never do I/O while holding it.
pub struct BoundedCache<K, V> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, making it the most recently used entry on a hit.
    pub fn try_get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Insert `value` unless `key` is already present.
    ///
    /// Returns `false` without touching recency when the key exists. Otherwise
    /// inserts as most recently used and evicts at most one entry, the least
    /// recently used, if that pushed the size over capacity.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut entries = self.lock();
        if entries.contains(&key) {
            return false;
        }
        if entries.push(key, value).is_some() {
            log::debug!("evicted least recently used entry");
        }
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    /// Drop every entry.
    pub fn flush(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn insert_and_get() {
        let cache = BoundedCache::new(2);
        assert!(cache.insert_if_absent("a", 1));
        assert_eq!(cache.try_get(&"a"), Some(1));
        assert_eq!(cache.try_get(&"b"), None);
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let cache = BoundedCache::new(2);
        assert!(cache.insert_if_absent("a", 1));
        assert!(!cache.insert_if_absent("a", 2));
        assert_eq!(cache.try_get(&"a"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_inserted() {
        let cache = BoundedCache::new(2);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        cache.insert_if_absent("c", 3);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn read_promotes_entry() {
        let cache = BoundedCache::new(2);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        assert_eq!(cache.try_get(&"a"), Some(1));
        cache.insert_if_absent("c", 3);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
    }

    #[test]
    fn rejected_insert_does_not_promote() {
        let cache = BoundedCache::new(2);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        assert!(!cache.insert_if_absent("a", 9));
        cache.insert_if_absent("c", 3);
        // "a" was still the oldest despite the rejected insert.
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"b"));
    }

    #[test]
    fn contains_does_not_promote() {
        let cache = BoundedCache::new(2);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        assert!(cache.contains(&"a"));
        cache.insert_if_absent("c", 3);
        assert!(!cache.contains(&"a"));
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = BoundedCache::new(3);
        for i in 0..50u32 {
            cache.insert_if_absent(i, i);
            if i % 3 == 0 {
                cache.try_get(&(i / 2));
            }
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn one_eviction_per_overflowing_insert() {
        let cache = BoundedCache::new(3);
        for i in 0..3 {
            cache.insert_if_absent(i, i);
        }
        cache.insert_if_absent(3, 3);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&0));
        assert!(cache.contains(&1));
    }

    #[test]
    fn zero_capacity_keeps_one_entry() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"b"));
    }

    #[test]
    fn flush_clears_everything() {
        let cache = BoundedCache::new(4);
        cache.insert_if_absent("a", 1);
        cache.insert_if_absent("b", 2);
        cache.flush();
        assert_eq!(cache.len(), 0);
        assert!(cache.insert_if_absent("a", 3));
        assert_eq!(cache.try_get(&"a"), Some(3));
    }

    #[test]
    fn concurrent_access_stays_bounded() {
        let cache = Arc::new(BoundedCache::new(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200u32 {
                        cache.insert_if_absent(t * 1000 + i, i);
                        cache.try_get(&(t * 1000 + i / 2));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
    }
}
