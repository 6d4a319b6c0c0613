//! Once-resolved store capability cache.
//!
//! Probing the schema costs a round trip, so the result is resolved once
//! per process and shared. `OnceCell::get_or_try_init` is the single-flight
//! guard: concurrent callers either run the one probe or wait for it, and a
//! failed probe leaves the cell empty so the next call retries.

use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;
use crate::store::{CorpusStore, StoreCapabilities};

/// Process-wide cache of one store's resolved capabilities.
#[derive(Default)]
pub struct SchemaCache {
    cell: OnceCell<StoreCapabilities>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved capabilities, probing the store on first use.
    pub async fn resolve(&self, store: &dyn CorpusStore) -> Result<&StoreCapabilities> {
        self.cell
            .get_or_try_init(|| async {
                let caps = store.capabilities().await?;
                debug!(
                    embedding_column = %caps.embedding_column,
                    full_text = caps.full_text,
                    "resolved store capabilities"
                );
                Ok(caps)
            })
            .await
    }

    /// Capabilities if already resolved.
    pub fn get(&self) -> Option<&StoreCapabilities> {
        self.cell.get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::StoreError;
    use crate::hit::DocHit;
    use crate::scope::ScopeFilter;

    struct ProbeCounting {
        probes: AtomicUsize,
        fail_first: AtomicUsize,
    }

    #[async_trait]
    impl CorpusStore for ProbeCounting {
        async fn capabilities(&self) -> Result<StoreCapabilities> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let failures_left = self.fail_first.load(Ordering::SeqCst);
            if failures_left > 0 {
                self.fail_first.store(failures_left - 1, Ordering::SeqCst);
                return Err(StoreError::Query("probe failed".to_string()));
            }
            Ok(StoreCapabilities {
                embedding_column: "embedding_1536".to_string(),
                full_text: true,
            })
        }

        fn sources(&self) -> Vec<String> {
            Vec::new()
        }

        async fn similarity_search(
            &self,
            _embedding: &[f32],
            _scope: &ScopeFilter,
            _limit: usize,
        ) -> Result<Vec<DocHit>> {
            Ok(Vec::new())
        }

        async fn pattern_search(
            &self,
            _tokens: &[String],
            _scope: &ScopeFilter,
            _limit: usize,
        ) -> Result<Vec<DocHit>> {
            Ok(Vec::new())
        }

        async fn pattern_search_in(
            &self,
            _source: &str,
            _tokens: &[String],
            _scope: &ScopeFilter,
            _limit: usize,
        ) -> Result<Vec<DocHit>> {
            Ok(Vec::new())
        }

        async fn full_text_search(
            &self,
            _query: &str,
            _scope: &ScopeFilter,
            _limit: usize,
        ) -> Result<Vec<DocHit>> {
            Ok(Vec::new())
        }

        async fn fetch_by_ids(&self, _ids: &[String]) -> Result<Vec<DocHit>> {
            Ok(Vec::new())
        }

        async fn sample_rows(&self, _source: &str, _limit: usize) -> Result<Vec<(String, String)>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn probes_once_and_caches() {
        let store = ProbeCounting {
            probes: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        };
        let cache = SchemaCache::new();

        let first = cache.resolve(&store).await.unwrap().clone();
        let second = cache.resolve(&store).await.unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(store.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_probe_retries_next_call() {
        let store = ProbeCounting {
            probes: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(1),
        };
        let cache = SchemaCache::new();

        assert!(cache.resolve(&store).await.is_err());
        assert!(cache.get().is_none());

        let caps = cache.resolve(&store).await.unwrap();
        assert!(caps.full_text);
        assert_eq!(store.probes.load(Ordering::SeqCst), 2);
    }
}
