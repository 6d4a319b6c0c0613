//! In-memory corpus store.
//!
//! Backs tests and small deployments. Ranking mirrors what the SQL adapters
//! produce: cosine similarity reported as `1 - distance`, pattern hits
//! ordered by content length, and full-text via the shared BM25 scorer.

use std::cmp::Reverse;

use async_trait::async_trait;
use ordered_float::OrderedFloat;

use trawl_providers::cosine_similarity;
use trawl_text::Bm25Index;

use crate::error::{Result, StoreError};
use crate::hit::DocHit;
use crate::scope::ScopeFilter;
use crate::store::{CorpusStore, StoreCapabilities};

/// Default source label for docs that do not declare one.
const DEFAULT_SOURCE: &str = "memory";

/// One corpus row.
#[derive(Debug, Clone)]
pub struct MemoryDoc {
    /// Stable id.
    pub id: String,

    /// Chunk text.
    pub text: String,

    /// Embedding, if backfilled.
    pub embedding: Option<Vec<f32>>,

    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,

    /// Owning agent, if scoped.
    pub agent_id: Option<String>,

    /// Namespace, if scoped.
    pub namespace: Option<String>,

    /// Contributing source label.
    pub source: String,
}

impl MemoryDoc {
    /// Create a row with text only.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding: None,
            metadata: None,
            agent_id: None,
            namespace: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Set the embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Scope to an agent.
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Scope to a namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Text column, else the metadata chunk fallback, matching the SQL
    /// adapters' `coalesce(text, metadata->>'chunk')` reads.
    fn body(&self) -> &str {
        if self.text.is_empty() {
            self.metadata
                .as_ref()
                .and_then(|m| m.get("chunk"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
        } else {
            &self.text
        }
    }

    fn to_hit(&self, score: f32) -> DocHit {
        let mut hit = DocHit::new(&self.id, score).with_text(&self.text);
        if let Some(metadata) = &self.metadata {
            hit = hit.with_metadata(metadata.clone());
        }
        hit
    }
}

/// An in-memory [`CorpusStore`].
pub struct MemoryStore {
    docs: Vec<MemoryDoc>,
    full_text: bool,
    embedding_column: String,
}

impl MemoryStore {
    /// Create an empty store with full-text ranking enabled.
    pub fn new() -> Self {
        Self {
            docs: Vec::new(),
            full_text: true,
            embedding_column: "embedding_1536".to_string(),
        }
    }

    /// Add a document.
    pub fn with_doc(mut self, doc: MemoryDoc) -> Self {
        self.docs.push(doc);
        self
    }

    /// Enable or disable the native full-text capability. Disabling forces
    /// callers onto the local BM25 fallback.
    pub fn with_full_text(mut self, full_text: bool) -> Self {
        self.full_text = full_text;
        self
    }

    /// Override the reported embedding column name.
    pub fn with_embedding_column(mut self, column: impl Into<String>) -> Self {
        self.embedding_column = column.into();
        self
    }

    fn scoped<'a>(&'a self, scope: &'a ScopeFilter) -> impl Iterator<Item = &'a MemoryDoc> {
        self.docs
            .iter()
            .filter(|d| scope.admits(d.agent_id.as_deref(), d.namespace.as_deref()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusStore for MemoryStore {
    async fn capabilities(&self) -> Result<StoreCapabilities> {
        Ok(StoreCapabilities {
            embedding_column: self.embedding_column.clone(),
            full_text: self.full_text,
        })
    }

    fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for doc in &self.docs {
            if !out.contains(&doc.source) {
                out.push(doc.source.clone());
            }
        }
        out
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>> {
        let mut hits: Vec<DocHit> = self
            .scoped(scope)
            .filter_map(|doc| {
                let stored = doc.embedding.as_ref()?;
                // Rows with a mismatched embedding dimension never match,
                // same as a SQL operator erroring on that row.
                let score = cosine_similarity(embedding, stored).ok()?;
                Some(doc.to_hit(score))
            })
            .collect();
        hits.sort_by_key(|h| Reverse(OrderedFloat(h.score)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn pattern_search(
        &self,
        tokens: &[String],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let needles: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut hits: Vec<DocHit> = self
            .scoped(scope)
            .filter(|doc| {
                let haystack = doc.body().to_lowercase();
                needles.iter().any(|n| haystack.contains(n))
            })
            .map(|doc| doc.to_hit(0.0))
            .collect();
        hits.sort_by_key(|h| Reverse(h.display_text().chars().count()));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn pattern_search_in(
        &self,
        source: &str,
        tokens: &[String],
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let needles: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut hits: Vec<DocHit> = self
            .scoped(scope)
            .filter(|doc| doc.source == source)
            .filter(|doc| {
                let haystack = doc.body().to_lowercase();
                needles.iter().any(|n| haystack.contains(n))
            })
            .map(|doc| doc.to_hit(0.0))
            .collect();
        hits.sort_by_key(|h| Reverse(h.display_text().chars().count()));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn full_text_search(
        &self,
        query: &str,
        scope: &ScopeFilter,
        limit: usize,
    ) -> Result<Vec<DocHit>> {
        if !self.full_text {
            return Err(StoreError::Unsupported("full-text index".to_string()));
        }
        let index = Bm25Index::build(
            self.scoped(scope)
                .map(|d| (d.id.clone(), d.body().to_string())),
        );
        let hits = index
            .search(query, limit)
            .into_iter()
            .map(|m| {
                let metadata = self
                    .docs
                    .iter()
                    .find(|d| d.id == m.id)
                    .and_then(|d| d.metadata.clone());
                let mut hit = DocHit::new(m.id, m.score).with_text(m.text);
                if let Some(metadata) = metadata {
                    hit = hit.with_metadata(metadata);
                }
                hit
            })
            .collect();
        Ok(hits)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<DocHit>> {
        Ok(self
            .docs
            .iter()
            .filter(|d| ids.contains(&d.id))
            .map(|d| d.to_hit(0.0))
            .collect())
    }

    async fn sample_rows(&self, source: &str, limit: usize) -> Result<Vec<(String, String)>> {
        Ok(self
            .docs
            .iter()
            .filter(|d| d.source == source)
            .take(limit)
            .map(|d| (d.id.clone(), d.body().to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_doc(
                MemoryDoc::new("idx:1", "diesel supply contract with payment terms")
                    .with_embedding(vec![1.0, 0.0])
                    .with_source("index"),
            )
            .with_doc(
                MemoryDoc::new("idx:2", "solar warranty")
                    .with_embedding(vec![0.0, 1.0])
                    .with_source("index"),
            )
            .with_doc(
                MemoryDoc::new("doc:1", "diesel pricing sheet")
                    .with_source("documents")
                    .with_agent("sales"),
            )
    }

    #[tokio::test]
    async fn similarity_ranks_by_cosine() {
        let hits = store()
            .similarity_search(&[1.0, 0.0], &ScopeFilter::all(), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "idx:1");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn pattern_orders_by_length_desc() {
        let hits = store()
            .pattern_search(&["diesel".to_string()], &ScopeFilter::all(), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "idx:1");
        assert_eq!(hits[1].id, "doc:1");
    }

    #[tokio::test]
    async fn scope_hides_other_agents() {
        let hits = store()
            .pattern_search(
                &["diesel".to_string()],
                &ScopeFilter::for_agent("support"),
                5,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "idx:1");
    }

    #[tokio::test]
    async fn full_text_unsupported_when_disabled() {
        let store = store().with_full_text(false);
        let err = store
            .full_text_search("diesel", &ScopeFilter::all(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unsupported(_)));
    }

    #[tokio::test]
    async fn sources_keep_insertion_order() {
        assert_eq!(store().sources(), vec!["index", "documents"]);
    }

    #[tokio::test]
    async fn sample_rows_filters_by_source() {
        let rows = store().sample_rows("documents", 10).await.unwrap();
        assert_eq!(rows, vec![("doc:1".to_string(), "diesel pricing sheet".to_string())]);
    }
}
