//! Embedding cache.
//!
//! Query expansions repeat across turns, so embeddings are cached per
//! (text, model) with a TTL and a size cap. In-memory only; entries expire
//! rather than persist.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::error::Result;
use crate::Embedding;

/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Default cache capacity.
const DEFAULT_MAX_ENTRIES: usize = 2048;

struct CacheEntry {
    embedding: Embedding,
    created_at: Instant,
}

/// TTL cache for embeddings keyed by text and model.
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a cache with the default TTL and capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with a custom capacity.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: DEFAULT_TTL,
            max_entries,
        }
    }

    /// Set the entry lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn hash_key(text: &str, model: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        model.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Get a live embedding from the cache.
    pub async fn get(&self, text: &str, model: &str) -> Option<Embedding> {
        let key = Self::hash_key(text, model);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if entry.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.embedding.clone())
    }

    /// Put an embedding in the cache, evicting the oldest entry at capacity.
    pub async fn put(&self, text: &str, model: &str, embedding: Embedding) {
        let key = Self::hash_key(text, model);
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                embedding,
                created_at: Instant::now(),
            },
        );
        debug!("Cached embedding (model: {model})");
    }

    /// Number of entries, including any not yet expired-and-evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// An embedding provider wrapped with a TTL cache.
pub struct CachedEmbeddings<P> {
    provider: P,
    cache: EmbeddingCache,
}

impl<P> CachedEmbeddings<P>
where
    P: EmbeddingProvider,
{
    /// Wrap a provider with the default cache.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: EmbeddingCache::new(),
        }
    }

    /// Wrap a provider with a custom cache.
    pub fn with_cache(provider: P, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait::async_trait]
impl<P> EmbeddingProvider for CachedEmbeddings<P>
where
    P: EmbeddingProvider,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    fn default_dimension(&self) -> usize {
        self.provider.default_dimension()
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());

        if let Some(embedding) = self.cache.get(&request.text, &model).await {
            debug!("Embedding cache hit");
            let dimension = embedding.len();
            return Ok(EmbeddingResponse {
                embedding,
                model,
                dimension,
                tokens_used: None,
            });
        }

        let response = self.provider.embed(request.clone()).await?;
        self.cache
            .put(&request.text, &model, response.embedding.clone())
            .await;
        Ok(response)
    }

    fn is_available(&self) -> bool {
        self.provider.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn default_model(&self) -> &str {
            "stub-model"
        }

        fn default_dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EmbeddingResponse {
                embedding: vec![1.0, 0.0, 0.0],
                model: "stub-model".to_string(),
                dimension: 3,
                tokens_used: None,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn cache_put_get() {
        let cache = EmbeddingCache::new();
        cache.put("hello", "m", vec![1.0, 2.0]).await;
        assert_eq!(cache.get("hello", "m").await, Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("hello", "other-model").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = EmbeddingCache::new().with_ttl(Duration::ZERO);
        cache.put("hello", "m", vec![1.0]).await;
        assert_eq!(cache.get("hello", "m").await, None);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let cache = EmbeddingCache::with_capacity(2);
        cache.put("a", "m", vec![1.0]).await;
        cache.put("b", "m", vec![2.0]).await;
        cache.put("c", "m", vec![3.0]).await;
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn cached_provider_calls_inner_once() {
        let wrapped = CachedEmbeddings::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });

        let first = wrapped.embed(EmbeddingRequest::new("diesel")).await.unwrap();
        let second = wrapped.embed(EmbeddingRequest::new("diesel")).await.unwrap();

        assert_eq!(first.embedding, second.embedding);
        assert_eq!(wrapped.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        struct FailingProvider;

        #[async_trait]
        impl EmbeddingProvider for FailingProvider {
            fn name(&self) -> &str {
                "failing"
            }
            fn default_model(&self) -> &str {
                "stub-model"
            }
            fn default_dimension(&self) -> usize {
                3
            }
            async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse> {
                Err(ProviderError::ApiRequest("down".to_string()))
            }
            fn is_available(&self) -> bool {
                false
            }
        }

        let wrapped = CachedEmbeddings::new(FailingProvider);
        let err = wrapped.embed(EmbeddingRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiRequest(_)));
        assert!(wrapped.cache().is_empty().await);
    }
}
