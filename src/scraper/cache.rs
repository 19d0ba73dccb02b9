use crate::scraper::Result;
use crate::scraper::types::{Candidate, ExternalIds, Identifier, ImageSet, MediaType, Metadata};
use moka::future::Cache;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

/// Memoizes remote lookups by composite key.
///
/// Entries never expire and are never evicted; only [`IdentifierCache::clear`]
/// drops them. Failed computations are not stored, so the next call retries.
#[derive(Clone)]
pub struct IdentifierCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
}

impl<K, V> IdentifierCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value).await;
    }

    /// Return the cached value or compute, store and return it
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.inner.get(&key).await {
            return Ok(value);
        }

        let value = compute().await?;
        self.inner.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Number of live entries
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Default for IdentifierCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for search results
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SearchKey {
    pub provider: String,
    pub media_type: MediaType,
    pub query: String,
    pub year: Option<i32>,
    pub language: String,
}

impl SearchKey {
    pub fn new(
        provider: &str,
        media_type: MediaType,
        query: &str,
        year: Option<i32>,
        language: &str,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            media_type,
            query: query.to_lowercase(),
            year,
            language: language.to_string(),
        }
    }
}

/// Cache key for foreign-id lookups and external-id back-fills
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct LookupKey {
    pub provider: String,
    pub media_type: MediaType,
    pub id: String,
}

impl LookupKey {
    pub fn new(provider: &str, media_type: MediaType, id: &str) -> Self {
        Self {
            provider: provider.to_string(),
            media_type,
            id: id.to_string(),
        }
    }
}

/// Cache key for detail records
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RecordKey {
    pub provider: String,
    pub media_type: MediaType,
    pub id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub language: Option<String>,
}

/// Cache key for raw artwork documents
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ArtworkKey {
    pub provider: String,
    pub category: String,
    pub id: String,
}

/// Cache key for resolved metadata and image sets
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ResolvedKey {
    pub identifier: Identifier,
    pub languages: Vec<String>,
}

/// Caches shared by the providers and resolvers of one run
#[derive(Clone, Default)]
pub struct ScraperCache {
    pub search: IdentifierCache<SearchKey, Arc<Vec<Candidate>>>,
    pub external_ids: IdentifierCache<LookupKey, ExternalIds>,
    pub records: IdentifierCache<RecordKey, Arc<serde_json::Value>>,
    pub artwork: IdentifierCache<ArtworkKey, Arc<serde_json::Value>>,
    pub metadata: IdentifierCache<ResolvedKey, Arc<Metadata>>,
    pub images: IdentifierCache<ResolvedKey, Arc<ImageSet>>,
}

impl ScraperCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all caches
    pub fn clear(&self) {
        self.search.clear();
        self.external_ids.clear();
        self.records.clear();
        self.artwork.clear();
        self.metadata.clear();
        self.images.clear();
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            search_entries: self.search.len().await,
            external_id_entries: self.external_ids.len().await,
            record_entries: self.records.len().await,
            artwork_entries: self.artwork.len().await,
            metadata_entries: self.metadata.len().await,
            image_entries: self.images.len().await,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub search_entries: u64,
    pub external_id_entries: u64,
    pub record_entries: u64,
    pub artwork_entries: u64,
    pub metadata_entries: u64,
    pub image_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::ScraperError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_or_compute_runs_once() {
        let cache: IdentifierCache<String, u32> = IdentifierCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .get_or_compute("key".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: IdentifierCache<&'static str, u32> = IdentifierCache::new();

        let first = cache
            .get_or_compute("key", || async {
                Err(ScraperError::NotFound("missing".into()))
            })
            .await;
        assert!(first.is_err());

        let second = cache.get_or_compute("key", || async { Ok(7) }).await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ScraperCache::new();
        let key = LookupKey::new("tmdb", MediaType::Movie, "603");
        cache
            .external_ids
            .insert(key.clone(), ExternalIds::default())
            .await;
        assert_eq!(cache.stats().await.external_id_entries, 1);

        cache.clear();
        assert!(cache.external_ids.get(&key).await.is_none());
    }

    #[test]
    fn test_search_key_is_case_insensitive() {
        let a = SearchKey::new("tmdb", MediaType::Movie, "The Matrix", Some(1999), "en");
        let b = SearchKey::new("tmdb", MediaType::Movie, "the matrix", Some(1999), "en");
        assert_eq!(a, b);
    }
}
