use crate::composition::Composition;
use crate::error::{LottieError, Result};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Default number of parsed documents kept around.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Fixed-capacity LRU map from string keys to values.
///
/// All operations go through one mutex, so concurrent callers see a
/// consistent view and block on each other.
pub struct LruCache<V> {
    inner: Mutex<lru::LruCache<String, V>>,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(LottieError::InvalidCacheCapacity)?;
        Ok(Self::with_capacity(capacity))
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        LruCache {
            inner: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, lru::LruCache<String, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let hit = self.lock().get(key).cloned();
        debug!(key, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Inserts at the most recently used end, evicting the least recently
    /// used entry when full.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some((evicted, _)) = self.lock().push(key.clone(), value) {
            if evicted != key {
                debug!(key = %evicted, "Cache evicted least recently used entry");
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().pop(key)
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|(k, _)| k.clone()).collect()
    }
}

/// Parsed compositions shared by key.
pub struct CompositionCache {
    entries: LruCache<Arc<Composition>>,
}

impl CompositionCache {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(CompositionCache {
            entries: LruCache::new(capacity)?,
        })
    }

    pub fn get(&self, key: &str) -> Option<Arc<Composition>> {
        self.entries.get(key)
    }

    pub fn put(&self, key: impl Into<String>, composition: Arc<Composition>) {
        self.entries.put(key, composition);
    }

    /// Returns the cached composition or loads and caches it.
    ///
    /// The loader runs outside the lock. Two racing loads of the same key
    /// both succeed and the later insert wins.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<Arc<Composition>>
    where
        F: FnOnce() -> Result<Composition>,
    {
        if let Some(hit) = self.entries.get(key) {
            return Ok(hit);
        }
        let composition = Arc::new(load()?);
        self.entries.put(key, Arc::clone(&composition));
        Ok(composition)
    }

    /// Disposes an entry; later lookups miss.
    pub fn remove(&self, key: &str) -> Option<Arc<Composition>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for CompositionCache {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        CompositionCache {
            entries: LruCache::with_capacity(capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn sorted_keys<V: Clone>(cache: &LruCache<V>) -> Vec<String> {
        let mut keys = cache.keys();
        keys.sort();
        keys
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        assert_eq!(sorted_keys(&cache), vec!["b", "c"]);

        assert_eq!(cache.get("b"), Some(2));
        cache.put("d", 4);
        assert_eq!(sorted_keys(&cache), vec!["b", "d"]);
        assert_eq!(cache.get("c"), None);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            LruCache::<u32>::new(0),
            Err(LottieError::InvalidCacheCapacity)
        ));
    }

    #[test]
    fn test_put_existing_key_replaces_value() {
        let cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn test_contains_does_not_touch_recency() {
        let cache = LruCache::new(2).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        assert!(cache.contains("a"));
        cache.put("c", 3);
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_concurrent_puts_never_exceed_capacity() {
        let cache = Arc::new(LruCache::new(3).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(format!("{t}-{i}"), i);
                        assert!(cache.len() <= 3);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_composition_cache_loads_once_and_disposes() {
        let cache = CompositionCache::new(2).unwrap();
        let mut loads = 0;
        let mut load = || {
            loads += 1;
            Composition::from_json_str(
                r#"{"v":"5.7.0","ip":0,"op":30,"fr":30,"w":10,"h":10,"layers":[]}"#,
            )
        };

        let first = cache.get_or_load("doc", &mut load).unwrap();
        let second = cache.get_or_load("doc", &mut load).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(cache.remove("doc").is_some());
        assert!(cache.get("doc").is_none());
        cache.get_or_load("doc", &mut load).unwrap();
        drop(load);
        assert_eq!(loads, 2);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(CompositionCache::default().entries.capacity(), DEFAULT_CACHE_CAPACITY);
    }
}
