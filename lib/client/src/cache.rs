use lru::LruCache;
use std::fmt::{Debug, Formatter};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// The default number of fragments kept by a [FragmentClient](crate::FragmentClient).
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// A bounded LRU cache of canonical requests.
///
/// Lookup and insertion happen while holding a single lock. Concurrent requests for the same key
/// therefore observe the same value.
pub struct RequestCache<V> {
    inner: Mutex<LruCache<String, V>>,
}

impl<V: Clone> RequestCache<V> {
    /// Creates a new cache. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the value stored under `key`, creating and inserting it with `create` if it is
    /// missing. The second component is `true` if the value was created.
    pub fn get_or_insert_with(&self, key: String, create: impl FnOnce() -> V) -> (V, bool) {
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = cache.get(&key) {
            return (value.clone(), false);
        }

        let value = create();
        cache.put(key, value.clone());
        (value, true)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Debug for RequestCache<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let len = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("RequestCache").field("len", &len).finish()
    }
}
