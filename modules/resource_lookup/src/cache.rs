//! Keyed cache slots with at most one in-flight build per key.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

type Slot<V> = Arc<OnceCell<Arc<V>>>;

/// Lazily built, manually invalidated values keyed by `K`.
///
/// Each key owns a `OnceCell`: the first caller on an empty slot runs the
/// build, concurrent callers await it. The map guard is released before any
/// build is awaited. A failed build leaves the slot empty and the next waiter
/// runs its own build.
///
/// Invalidation swaps slots out of the map. A build already in flight
/// finishes into the detached slot and is not visible to later readers.
pub struct SingleFlightCache<K, V> {
    name: &'static str,
    slots: DashMap<K, Slot<V>>,
}

impl<K, V> std::fmt::Debug for SingleFlightCache<K, V>
where
    K: Eq + Hash + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let populated = self
            .slots
            .iter()
            .filter(|e| e.value().initialized())
            .count();
        f.debug_struct("SingleFlightCache")
            .field("name", &self.name)
            .field("slots", &self.slots.len())
            .field("populated", &populated)
            .finish()
    }
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slot(&self, key: &K) -> Slot<V> {
        if let Some(slot) = self.slots.get(key) {
            return slot.value().clone();
        }
        self.slots.entry(key.clone()).or_default().value().clone()
    }

    /// Return the cached value for `key`, building it on a miss.
    pub async fn get_or_try_build<F, Fut, E>(&self, key: K, build: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        if let Some(value) = slot.get() {
            tracing::trace!(cache = self.name, ?key, "cache hit");
            return Ok(value.clone());
        }

        let value = slot
            .get_or_try_init(|| async {
                tracing::debug!(cache = self.name, ?key, "cache miss; building");
                build().await.map(Arc::new)
            })
            .await?;
        Ok(value.clone())
    }

    /// The cached value, without building.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.slots.get(key).and_then(|slot| slot.value().get().cloned())
    }

    pub fn is_populated(&self, key: &K) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.value().initialized())
    }

    pub fn invalidate(&self, key: &K) {
        self.slots.remove(key);
    }

    pub fn invalidate_all(&self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_build() {
        let cache: Arc<SingleFlightCache<&'static str, usize>> =
            Arc::new(SingleFlightCache::new("test"));
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let builds = builds.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_build("k", || async {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>(42)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(*h.await.unwrap(), 42);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_leaves_slot_empty() {
        let cache: SingleFlightCache<u8, String> = SingleFlightCache::new("test");

        let err = cache
            .get_or_try_build(1, || async { Err::<String, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(!cache.is_populated(&1));
        assert!(cache.peek(&1).is_none());

        let ok = cache
            .get_or_try_build(1, || async { Ok::<_, &str>("fine".to_string()) })
            .await
            .unwrap();
        assert_eq!(ok.as_str(), "fine");
        assert!(cache.is_populated(&1));
    }

    #[tokio::test]
    async fn hit_returns_same_allocation_until_invalidated() {
        let cache: SingleFlightCache<u8, Vec<u32>> = SingleFlightCache::new("test");
        let first = cache
            .get_or_try_build(7, || async { Ok::<_, ()>(vec![1, 2]) })
            .await
            .unwrap();
        let second = cache
            .get_or_try_build(7, || async { Ok::<_, ()>(vec![9]) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate_all();
        assert!(!cache.is_populated(&7));
        let third = cache
            .get_or_try_build(7, || async { Ok::<_, ()>(vec![3]) })
            .await
            .unwrap();
        assert_eq!(*third, vec![3]);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache: SingleFlightCache<&'static str, u32> = SingleFlightCache::new("test");
        cache
            .get_or_try_build("a", || async { Ok::<_, ()>(1) })
            .await
            .unwrap();
        assert!(cache.is_populated(&"a"));
        assert!(!cache.is_populated(&"b"));

        cache.invalidate(&"a");
        assert!(!cache.is_populated(&"a"));
    }
}
