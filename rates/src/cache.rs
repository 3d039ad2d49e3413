//! Rate caching with a last-known-rate fallback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ledgersweep_common::{CurrencyPair, Rate};
use tracing::{debug, warn};

use crate::error::RateResult;
use crate::source::RateSource;

/// Cached rate entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    rate: Rate,
    cached_at: DateTime<Utc>,
}

/// Configuration for the rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a cached rate is served without refetching.
    pub fresh_ttl: Duration,
    /// How long a stale rate may still be used when the source is down.
    /// Set to zero to disable the fallback.
    pub stale_ttl: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::seconds(5),
            stale_ttl: Duration::zero(),
        }
    }
}

/// Thread-safe rate cache keyed by currency pair.
pub struct RateCache {
    cache: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
}

impl RateCache {
    /// Create a new cache with the given configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Get a fresh rate, if one is cached.
    pub fn get_fresh(&self, pair: &CurrencyPair) -> Option<Rate> {
        self.entry_within(pair, self.config.fresh_ttl)
    }

    /// Get the last known rate within the stale window, if any.
    pub fn get_stale(&self, pair: &CurrencyPair) -> Option<Rate> {
        self.entry_within(pair, self.config.fresh_ttl + self.config.stale_ttl)
    }

    /// Insert a rate.
    pub fn insert(&self, rate: Rate) {
        let key = Self::cache_key(&rate.pair);
        self.cache.insert(
            key,
            CacheEntry {
                rate,
                cached_at: Utc::now(),
            },
        );
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn entry_within(&self, pair: &CurrencyPair, ttl: Duration) -> Option<Rate> {
        let entry = self.cache.get(&Self::cache_key(pair))?;
        let age = Utc::now().signed_duration_since(entry.cached_at);
        (age < ttl).then(|| entry.rate.clone())
    }

    fn cache_key(pair: &CurrencyPair) -> String {
        format!("{}/{}", pair.base.code(), pair.quote.code())
    }
}

/// A rate source wrapper that serves cached rates and falls back to the
/// last known rate when the underlying source fails.
pub struct CachedRateSource {
    inner: Arc<dyn RateSource>,
    cache: RateCache,
}

impl CachedRateSource {
    /// Wrap a rate source with caching.
    pub fn new(inner: Arc<dyn RateSource>, config: RateCacheConfig) -> Self {
        Self {
            inner,
            cache: RateCache::with_config(config),
        }
    }
}

#[async_trait]
impl RateSource for CachedRateSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> RateResult<Rate> {
        if let Some(rate) = self.cache.get_fresh(pair) {
            debug!(pair = %pair, "Serving cached rate");
            return Ok(rate);
        }

        match self.inner.get_rate(pair).await {
            Ok(rate) => {
                self.cache.insert(rate.clone());
                Ok(rate)
            }
            Err(e) => {
                if let Some(stale) = self.cache.get_stale(pair) {
                    warn!(
                        pair = %pair,
                        error = %e,
                        quoted_at = %stale.quoted_at,
                        "Rate source failed, using last known rate"
                    );
                    return Ok(stale);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockRateSource;
    use ledgersweep_common::Currency;
    use rust_decimal_macros::dec;

    fn usd_eur() -> CurrencyPair {
        CurrencyPair::new(Currency::usd(), Currency::eur())
    }

    #[test]
    fn test_cache_fresh_hit_and_miss() {
        let cache = RateCache::with_config(RateCacheConfig::default());
        assert!(cache.get_fresh(&usd_eur()).is_none());

        cache.insert(Rate::new(usd_eur(), dec!(0.9), "TEST"));
        assert_eq!(cache.get_fresh(&usd_eur()).unwrap().rate, dec!(0.9));
    }

    #[test]
    fn test_cache_expiry() {
        let cache = RateCache::with_config(RateCacheConfig {
            fresh_ttl: Duration::zero(),
            stale_ttl: Duration::zero(),
        });

        cache.insert(Rate::new(usd_eur(), dec!(0.9), "TEST"));
        assert!(cache.get_fresh(&usd_eur()).is_none());
        assert!(cache.get_stale(&usd_eur()).is_none());
    }

    #[tokio::test]
    async fn test_cached_source_serves_from_cache() {
        let mock = Arc::new(MockRateSource::new("test"));
        mock.set_rate(usd_eur(), dec!(0.9));

        let cached = CachedRateSource::new(mock.clone(), RateCacheConfig::default());

        assert_eq!(cached.get_rate(&usd_eur()).await.unwrap().rate, dec!(0.9));

        // Outage after first fetch: the fresh cache still answers.
        mock.set_unavailable(true);
        assert_eq!(cached.get_rate(&usd_eur()).await.unwrap().rate, dec!(0.9));
    }

    #[tokio::test]
    async fn test_stale_fallback_on_outage() {
        let mock = Arc::new(MockRateSource::new("test"));
        mock.set_rate(usd_eur(), dec!(0.9));

        let cached = CachedRateSource::new(
            mock.clone(),
            RateCacheConfig {
                fresh_ttl: Duration::zero(),
                stale_ttl: Duration::minutes(5),
            },
        );

        cached.get_rate(&usd_eur()).await.unwrap();

        mock.set_unavailable(true);
        let rate = cached.get_rate(&usd_eur()).await.unwrap();
        assert_eq!(rate.rate, dec!(0.9));
    }

    #[tokio::test]
    async fn test_outage_without_history_fails() {
        let mock = Arc::new(MockRateSource::new("test"));
        mock.set_unavailable(true);

        let cached = CachedRateSource::new(mock, RateCacheConfig::default());

        assert!(cached.get_rate(&usd_eur()).await.is_err());
    }
}
