use crate::core::ranker::GeocodeResolver;
use crate::models::Coordinates;
use std::time::Duration;

/// In-memory cache of geocode results, address → coordinates
///
/// Restaurant addresses repeat across ranking passes; hitting the cache
/// skips both the network call and the inter-call pacing delay.
pub struct GeocodeCache {
    entries: moka::future::Cache<String, Coordinates>,
}

impl GeocodeCache {
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    pub async fn get(&self, address: &str) -> Option<Coordinates> {
        self.entries.get(address).await
    }

    pub async fn insert(&self, address: &str, coords: Coordinates) {
        self.entries.insert(address.to_string(), coords).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

/// Geocode resolver that consults the cache before the wrapped backend
///
/// Only successful resolutions are cached; not-found and failures go
/// back to the backend next time (the upstream data may have improved).
pub struct CachedResolver<G> {
    inner: G,
    cache: GeocodeCache,
}

impl<G> CachedResolver<G> {
    pub fn new(inner: G, cache: GeocodeCache) -> Self {
        Self { inner, cache }
    }
}

impl<G: GeocodeResolver> GeocodeResolver for CachedResolver<G> {
    type Error = G::Error;

    async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, G::Error> {
        if let Some(coords) = self.cache.get(address).await {
            tracing::trace!("Geocode cache hit: {}", address);
            return Ok(Some(coords));
        }

        let resolved = self.inner.resolve(address).await?;
        if let Some(coords) = resolved {
            self.cache.insert(address, coords).await;
        }
        Ok(resolved)
    }
}
