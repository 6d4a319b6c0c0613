//! The async seam between the retrieval strategies and the chunk store.
//!
//! Deployments differ in which embedding column exists and whether a native
//! full-text index is present, so the store reports its capabilities once
//! and the pipeline adapts instead of hard-coding a schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hit::DocHit;
use crate::scope::ScopeFilter;

/// Schema capabilities resolved from a live store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCapabilities {
    /// Name of the embedding column dense queries should target.
    pub embedding_column: String,

    /// Whether the store can rank by a native full-text index.
    pub full_text: bool,
}

/// A corpus of chunks the strategies query against.
///
/// Implementations answer ranked queries; they never interpret retrieval
/// semantics. Every method takes a [`ScopeFilter`] that is forwarded
/// opaquely. Result lists come back best-first in the store's own order,
/// which fusion treats as the unit of evidence.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Probe the live schema. Called once per process via the schema cache.
    async fn capabilities(&self) -> Result<StoreCapabilities>;

    /// Contributing sources, primary first. Used by the keyword prefilter
    /// (per-source confidence) and the local BM25 corpus build.
    fn sources(&self) -> Vec<String>;

    /// Nearest-neighbor search by vector distance, at most `limit` hits,
    /// scored as `1 - distance` so higher is better.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>>;

    /// Substring search matching any of `tokens`, ordered by content length
    /// descending, at most `limit` hits.
    async fn pattern_search(
        &self,
        tokens: &[String],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>>;

    /// [`CorpusStore::pattern_search`] restricted to one source.
    async fn pattern_search_in(
        &self,
        source: &str,
        tokens: &[String],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>>;

    /// Native full-text ranking. Errors with
    /// [`StoreError::Unsupported`](crate::StoreError::Unsupported) when the
    /// capability probe reported `full_text: false`.
    async fn full_text_search(
        &self,
        query: &str,
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>>;

    /// Bulk fetch by id, used to backfill missing text on selected hits.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<DocHit>>;

    /// Sample up to `limit` `(id, text)` rows from one source for the local
    /// BM25 index build.
    async fn sample_rows(&self, source: &str, limit: usize) -> Result<Vec<(String, String)>>;
}
