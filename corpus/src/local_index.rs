//! Process-wide local BM25 index with TTL refresh.
//!
//! Fallback full-text ranking for stores without a native index. Built by
//! sampling each contributing source, kept for a TTL, and rebuilt behind a
//! single-flight guard: the async mutex is held across the whole rebuild,
//! so concurrent callers wait for the one rebuild instead of duplicating it
//! and never observe a half-built index.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use trawl_text::{Bm25Index, Normalizer};

use crate::error::Result;
use crate::store::CorpusStore;

/// Default index lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default per-source row sample cap.
const DEFAULT_SAMPLE_CAP: usize = 1200;

struct BuiltIndex {
    index: Arc<Bm25Index>,
    built_at: Instant,
}

/// Cached local BM25 index over a sampled corpus.
pub struct LocalIndexCache {
    state: Mutex<Option<BuiltIndex>>,
    normalizer: Normalizer,
    ttl: Duration,
    sample_cap: usize,
}

impl LocalIndexCache {
    /// Create a cache with the default TTL and sample cap.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
            normalizer: Normalizer::new(),
            ttl: DEFAULT_TTL,
            sample_cap: DEFAULT_SAMPLE_CAP,
        }
    }

    /// Set the index lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-source sample cap.
    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    /// The current index, building or rebuilding it if missing or stale.
    pub async fn get_or_build(&self, store: &dyn CorpusStore) -> Result<Arc<Bm25Index>> {
        let mut state = self.state.lock().await;

        if let Some(built) = state.as_ref() {
            if built.built_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&built.index));
            }
            debug!("local BM25 index stale, rebuilding");
        }

        let index = Arc::new(self.build(store).await?);
        *state = Some(BuiltIndex {
            index: Arc::clone(&index),
            built_at: Instant::now(),
        });
        Ok(index)
    }

    /// Sample every source and build a fresh index. A source that fails to
    /// sample is skipped; it only narrows the fallback corpus.
    async fn build(&self, store: &dyn CorpusStore) -> Result<Bm25Index> {
        let mut rows: Vec<(String, String)> = Vec::new();
        for source in store.sources() {
            match store.sample_rows(&source, self.sample_cap).await {
                Ok(sampled) => {
                    for (id, text) in sampled {
                        rows.push((id, self.normalizer.normalize(&text)));
                    }
                }
                Err(err) => {
                    warn!("sampling source {source} for local BM25 failed: {err}");
                }
            }
        }
        let index = Bm25Index::build(rows);
        debug!("built local BM25 index over {} documents", index.len());
        Ok(index)
    }
}

impl Default for LocalIndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::memory::{MemoryDoc, MemoryStore};

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_doc(MemoryDoc::new("a:1", "diesel supply contract terms"))
            .with_doc(MemoryDoc::new("a:2", "solar warranty details"))
    }

    #[tokio::test]
    async fn builds_once_within_ttl() {
        let store = store();
        let cache = LocalIndexCache::new();

        let first = cache.get_or_build(&store).await.unwrap();
        let second = cache.get_or_build(&store).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rebuilds_after_ttl() {
        let store = store();
        let cache = LocalIndexCache::new().with_ttl(Duration::from_secs(300));

        let first = cache.get_or_build(&store).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        let second = cache.get_or_build(&store).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn index_ranks_sampled_rows() {
        let store = store();
        let cache = LocalIndexCache::new();

        let index = cache.get_or_build(&store).await.unwrap();
        let hits = index.search("diesel", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a:1");
    }
}
