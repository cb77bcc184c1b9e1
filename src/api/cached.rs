//! Quote source decorator backed by `PriceCache`
//!
//! Fresh cache hits never touch the network. On a miss exactly one caller
//! refreshes; everyone else arriving meanwhile goes straight to the upstream
//! source without touching the cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::api::QuoteSource;
use crate::cache::PriceCache;
use crate::models::{PriceSet, Quote, Symbol};
use crate::utils::errors::FetchError;

pub struct CachedQuoteSource {
    source: Arc<dyn QuoteSource>,
    cache: Arc<PriceCache>,
}

impl CachedQuoteSource {
    pub fn new(source: Arc<dyn QuoteSource>, ttl: Duration) -> Self {
        Self::with_cache(source, Arc::new(PriceCache::new(ttl)))
    }

    pub fn with_cache(source: Arc<dyn QuoteSource>, cache: Arc<PriceCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// The wrapped, uncached source
    pub fn inner(&self) -> &Arc<dyn QuoteSource> {
        &self.source
    }

    pub async fn get_all_prices(&self) -> Result<PriceSet, FetchError> {
        if let Some(cached) = self.cache.get() {
            debug!(cache_age = ?self.cache.age(), "Return prices from cache");
            return Ok((*cached).clone());
        }

        let Some(_gate) = self.cache.try_begin_refresh() else {
            debug!("Refresh already in flight, fetching directly");
            return self.source.fetch_all().await;
        };

        debug!("Cache miss, fetching prices from API");
        match self.source.fetch_all().await {
            Ok(prices) => {
                self.cache.set(prices.clone());
                debug!(
                    ttl = ?self.cache.ttl(),
                    btc = prices.contains(Symbol::Btc),
                    eth = prices.contains(Symbol::Eth),
                    "Prices cached successfully"
                );
                Ok(prices)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch prices from API");
                if let Some(stale) = self.cache.last_stored() {
                    warn!(cache_age = ?self.cache.age(), "Returning stale cache data due to API error");
                    return Ok((*stale).clone());
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl QuoteSource for CachedQuoteSource {
    async fn fetch_one(&self, symbol: Symbol) -> Result<Quote, FetchError> {
        self.source.fetch_one(symbol).await
    }

    async fn fetch_all(&self) -> Result<PriceSet, FetchError> {
        self.get_all_prices().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{prices, ScriptedSource};

    fn cached(source: Arc<ScriptedSource>, ttl: Duration) -> CachedQuoteSource {
        CachedQuoteSource::new(source, ttl)
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_source() {
        let source = Arc::new(ScriptedSource::always(Ok(prices("50000", "3000"))));
        let client = cached(source.clone(), Duration::from_secs(60));

        let first = client.get_all_prices().await.expect("first fetch");
        let second = client.get_all_prices().await.expect("cached fetch");

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
        assert!(!client.cache().is_refreshing());
    }

    #[tokio::test]
    async fn test_source_error_without_cache_propagates() {
        let source = Arc::new(ScriptedSource::always(Err(())));
        let client = cached(source.clone(), Duration::from_secs(60));

        let err = client.get_all_prices().await.expect_err("no data ever existed");
        assert!(matches!(err, FetchError::Source(_)));
        assert!(!client.cache().is_refreshing(), "gate released on error path");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_data_returned_on_source_error() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(prices("50000", "3000"))], Err(())));
        let client = cached(source.clone(), Duration::from_secs(60));

        client.get_all_prices().await.expect("seed");
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(client.cache().get().is_none());

        let stale = client.get_all_prices().await.expect("stale fallback");
        assert_eq!(stale.get(Symbol::Btc).map(|q| q.price.as_str()), Some("50000"));
        assert_eq!(source.calls(), 2);
        assert!(!client.cache().is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_is_refreshed() {
        let source = Arc::new(ScriptedSource::new(
            vec![Ok(prices("1", "1")), Ok(prices("2", "2"))],
            Err(()),
        ));
        let client = cached(source.clone(), Duration::from_secs(60));

        client.get_all_prices().await.expect("seed");
        tokio::time::advance(Duration::from_secs(61)).await;

        let refreshed = client.get_all_prices().await.expect("refresh");
        assert_eq!(refreshed.get(Symbol::Eth).map(|q| q.price.as_str()), Some("2"));
        let stored = client.cache().get().expect("cache updated");
        assert_eq!(*stored, refreshed);
    }

    #[tokio::test]
    async fn test_concurrent_miss_bypasses_cache_while_refreshing() {
        let source = Arc::new(
            ScriptedSource::new(vec![Ok(prices("1", "1"))], Ok(prices("2", "2")))
                .with_delay(Duration::from_millis(100)),
        );
        let client = Arc::new(cached(source.clone(), Duration::from_secs(60)));

        let refresher = {
            let client = client.clone();
            tokio::spawn(async move { client.get_all_prices().await })
        };

        // Let the refresher take the gate
        while !client.cache().is_refreshing() {
            tokio::task::yield_now().await;
        }

        let direct = client.get_all_prices().await.expect("direct fetch");
        assert_eq!(direct.get(Symbol::Btc).map(|q| q.price.as_str()), Some("2"));

        let refreshed = refresher.await.expect("join").expect("refresh");
        assert_eq!(refreshed.get(Symbol::Btc).map(|q| q.price.as_str()), Some("1"));

        // Only the gate holder wrote the cache
        let stored = client.cache().get().expect("cached");
        assert_eq!(stored.get(Symbol::Btc).map(|q| q.price.as_str()), Some("1"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_dropped_refresh_releases_gate() {
        let source = Arc::new(
            ScriptedSource::always(Ok(prices("1", "1"))).with_delay(Duration::from_secs(30)),
        );
        let client = cached(source.clone(), Duration::from_secs(60));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), client.get_all_prices()).await;

        assert!(timed_out.is_err());
        assert!(!client.cache().is_refreshing());
        assert!(client.cache().last_stored().is_none());
    }
}
