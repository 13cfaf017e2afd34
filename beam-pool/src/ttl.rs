use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, interval};

/// Per-entry TTL override: `Finite` expires after the given duration from last
/// touch, `Infinite` never expires (the reference's `ttl < 0` sentinel).
#[derive(Debug, Clone, Copy)]
pub enum Ttl {
    Infinite,
    Finite(Duration),
}

struct Item<V> {
    data: V,
    ttl: Ttl,
    expires_at: Instant,
}

impl<V> Item<V> {
    fn expired(&self, now: Instant) -> bool {
        matches!(self.ttl, Ttl::Finite(_)) && now >= self.expires_at
    }

    fn touch(&mut self, now: Instant) {
        if let Ttl::Finite(ttl) = self.ttl {
            self.expires_at = now + ttl;
        }
    }
}

/// A generic string-keyed map with per-entry expiry, a periodic sweeper, and an
/// eviction callback — the TTL cache backing `ProducerPool` (§4.8).
///
/// Eviction callbacks run while the sweeper (or a `get`/`delete` caller) holds the
/// map write-lock for that key's removal; they must be fast and non-blocking, as
/// the reference design only ever uses them to call `close()` on a pooled resource.
pub struct TtlCache<V> {
    items: RwLock<HashMap<String, Item<V>>>,
    default_ttl: Duration,
    on_evict: Box<dyn Fn(&str, &V) + Send + Sync>,
}

impl<V: Send + Sync + 'static> TtlCache<V> {
    /// `default_ttl` is used whenever `set` is called (the "inherit default" case);
    /// `clean_interval` paces the background sweeper task.
    pub fn new(
        default_ttl: Duration,
        clean_interval: Duration,
        on_evict: impl Fn(&str, &V) + Send + Sync + 'static,
    ) -> Arc<Self> {
        let cache = Arc::new(TtlCache {
            items: RwLock::new(HashMap::new()),
            default_ttl,
            on_evict: Box::new(on_evict),
        });
        let sweeper = cache.clone();
        tokio::spawn(async move { sweeper.sweep_loop(clean_interval).await });
        cache
    }

    async fn sweep_loop(self: Arc<Self>, clean_interval: Duration) {
        let mut ticker = interval(clean_interval);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let expired_keys: Vec<String> = {
                let items = self.items.read().await;
                items
                    .iter()
                    .filter(|(_, item)| item.expired(now))
                    .map(|(k, _)| k.clone())
                    .collect()
            };
            for key in expired_keys {
                let mut items = self.items.write().await;
                if let Some(item) = items.get(&key) {
                    if item.expired(now) {
                        (self.on_evict)(&key, &item.data);
                        items.remove(&key);
                    }
                }
            }
        }
    }

    /// Inherit-default insert, equivalent to `SetWithTTL(key, data, 0)`.
    pub async fn set(&self, key: impl Into<String>, data: V) {
        self.set_with_ttl(key, data, Ttl::Finite(self.default_ttl)).await;
    }

    pub async fn set_with_ttl(&self, key: impl Into<String>, data: V, ttl: Ttl) {
        let now = Instant::now();
        let expires_at = match ttl {
            Ttl::Infinite => now,
            Ttl::Finite(d) => now + d,
        };
        let mut items = self.items.write().await;
        items.insert(key.into(), Item { data, ttl, expires_at });
    }

    /// Refreshes the entry's expiry on a hit (unless infinite); returns a clone
    /// of the value, or `None` on a miss (invoking the eviction callback first
    /// if the entry was present but expired).
    pub async fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        {
            let items = self.items.read().await;
            if let Some(item) = items.get(key) {
                if !item.expired(now) {
                    if matches!(item.ttl, Ttl::Infinite) {
                        return Some(item.data.clone());
                    }
                    // Fall through to take the write lock and touch the entry.
                } else {
                    drop(items);
                    let mut items = self.items.write().await;
                    if let Some(item) = items.remove(key) {
                        (self.on_evict)(key, &item.data);
                    }
                    return None;
                }
            } else {
                return None;
            }
        }

        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(key) {
            item.touch(now);
            Some(item.data.clone())
        } else {
            None
        }
    }

    pub async fn delete(&self, key: &str) {
        let mut items = self.items.write().await;
        if let Some(item) = items.remove(key) {
            (self.on_evict)(key, &item.data);
        }
    }

    pub async fn count(&self) -> usize {
        self.items.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_eviction_callback_once() {
        let evictions = Arc::new(AtomicUsize::new(0));
        let evictions_clone = evictions.clone();
        let cache = TtlCache::new(Duration::from_millis(20), Duration::from_millis(5), move |_, _: &u32| {
            evictions_clone.fetch_add(1, Ordering::SeqCst);
        });

        cache.set("k", 1u32).await;
        assert_eq!(cache.get("k").await, Some(1));

        tokio::time::advance(Duration::from_millis(50)).await;
        // let the sweeper run
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(cache.get("k").await, None);
        assert_eq!(evictions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn infinite_ttl_never_expires() {
        let cache = TtlCache::new(Duration::from_millis(10), Duration::from_millis(5), |_, _: &u32| {});
        cache.set_with_ttl("k", 7u32, Ttl::Infinite).await;

        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.get("k").await, Some(7));
    }
}
