//! In-memory price cache with a TTL and a single-flight refresh gate
//!
//! Data and the refresh flag live behind separate locks so readers and writers
//! never wait on a caller that is deciding whether to refresh.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::models::PriceSet;

#[derive(Default)]
struct Entry {
    prices: Option<Arc<PriceSet>>,
    stored_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        match (&self.prices, self.stored_at) {
            (Some(_), Some(at)) => at.elapsed() > ttl,
            _ => true,
        }
    }
}

pub struct PriceCache {
    entry: RwLock<Entry>,
    refreshing: Mutex<bool>,
    ttl: Duration,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(Entry::default()),
            refreshing: Mutex::new(false),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stored prices if they are no older than the TTL
    pub fn get(&self) -> Option<Arc<PriceSet>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        if entry.is_expired(self.ttl) {
            return None;
        }
        entry.prices.clone()
    }

    /// Last stored prices regardless of age
    pub fn last_stored(&self) -> Option<Arc<PriceSet>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.prices.clone()
    }

    /// Replace the stored prices and restart the TTL clock
    pub fn set(&self, prices: PriceSet) {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        entry.prices = Some(Arc::new(prices));
        entry.stored_at = Some(Instant::now());
    }

    pub fn is_expired(&self) -> bool {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.is_expired(self.ttl)
    }

    /// Time since the last `set`, zero if nothing was ever stored
    pub fn age(&self) -> Duration {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.stored_at.map(|at| at.elapsed()).unwrap_or_default()
    }

    /// Try to become the single refresher.
    ///
    /// Returns `true` if the gate was acquired; the caller must then call
    /// `end_refresh` exactly once. Prefer `try_begin_refresh`.
    pub fn start_refresh(&self) -> bool {
        let mut refreshing = self.refreshing.lock().unwrap_or_else(PoisonError::into_inner);
        if *refreshing {
            return false;
        }
        *refreshing = true;
        true
    }

    pub fn end_refresh(&self) {
        let mut refreshing = self.refreshing.lock().unwrap_or_else(PoisonError::into_inner);
        *refreshing = false;
    }

    pub fn is_refreshing(&self) -> bool {
        *self.refreshing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scoped form of `start_refresh`: the gate is released when the guard drops,
    /// including on early return, panic or when the owning future is dropped.
    pub fn try_begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        if self.start_refresh() {
            debug!("Refresh gate acquired");
            Some(RefreshGuard { cache: self })
        } else {
            None
        }
    }
}

/// Holds the refresh gate of a `PriceCache`
pub struct RefreshGuard<'a> {
    cache: &'a PriceCache,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.cache.end_refresh();
        debug!("Refresh gate released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quote, Symbol};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn btc(price: &str) -> PriceSet {
        PriceSet::from_quotes(vec![Quote::new(Symbol::Btc, price)])
    }

    #[tokio::test]
    async fn test_price_cache() {
        let cache = PriceCache::new(Duration::from_secs(60));
        assert!(cache.get().is_none(), "Empty cache should return nothing");
        assert_eq!(cache.age(), Duration::ZERO);

        cache.set(btc("50000.00"));

        let cached = cache.get().expect("Cache should return prices after setting");
        assert_eq!(cached.get(Symbol::Btc).map(|q| q.price.as_str()), Some("50000.00"));
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = PriceCache::new(Duration::from_millis(1));
        cache.set(btc("50000"));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get().is_none(), "Prices should be expired after TTL");
        assert!(cache.is_expired());
        // The stale value is still reachable for fallback
        assert!(cache.last_stored().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let ttl = Duration::from_secs(60);
        let cache = PriceCache::new(ttl);
        cache.set(btc("1"));

        tokio::time::advance(ttl).await;
        assert!(cache.get().is_some(), "elapsed == ttl is still fresh");
        assert_eq!(cache.age(), ttl);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get().is_none(), "elapsed > ttl is expired");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_whole_set() {
        let cache = PriceCache::new(Duration::from_secs(60));
        cache.set(PriceSet::from_quotes(vec![
            Quote::new(Symbol::Btc, "1"),
            Quote::new(Symbol::Eth, "2"),
        ]));
        tokio::time::advance(Duration::from_secs(30)).await;

        cache.set(PriceSet::from_quotes(vec![Quote::new(Symbol::Eth, "3")]));

        let cached = cache.get().expect("fresh");
        assert!(cached.get(Symbol::Btc).is_none(), "no merge across sets");
        assert_eq!(cached.get(Symbol::Eth).map(|q| q.price.as_str()), Some("3"));
        assert_eq!(cache.age(), Duration::ZERO);
    }

    #[test]
    fn test_start_refresh_single_winner() {
        let cache = Arc::new(PriceCache::new(Duration::from_secs(60)));
        let barrier = Arc::new(Barrier::new(16));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                let winners = winners.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    if cache.start_refresh() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(cache.is_refreshing());

        cache.end_refresh();
        assert!(cache.start_refresh(), "gate is reusable after release");
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let cache = Arc::new(PriceCache::new(Duration::from_secs(60)));

        let inner = cache.clone();
        let result = std::thread::spawn(move || {
            let _guard = inner.try_begin_refresh().expect("gate free");
            panic!("refresh blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!cache.is_refreshing());
    }

    #[test]
    fn test_guard_blocks_second_refresher() {
        let cache = PriceCache::new(Duration::from_secs(60));

        let guard = cache.try_begin_refresh();
        assert!(guard.is_some());
        assert!(cache.try_begin_refresh().is_none());

        drop(guard);
        assert!(cache.try_begin_refresh().is_some());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(PriceCache::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.set(btc(&format!("{}", 50000 + i)));
                    cache.get()
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().expect("thread panicked");
            assert!(seen.is_some());
        }
        assert!(cache.get().is_some());
    }
}
