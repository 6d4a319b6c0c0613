//! The candidate unit passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// A document hit at some pipeline stage.
///
/// `id` is immutable once the hit enters a candidate set. `score` is
/// stage-local: a dense cosine similarity, a BM25 score, and a fused RRF
/// score all live on different scales, so scores are never compared across
/// stages without fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocHit {
    /// Stable document/chunk id.
    pub id: String,

    /// Stage-local relevance score.
    pub score: f32,

    /// Chunk text (may be empty until backfilled).
    pub text: String,

    /// Free-form metadata from the store.
    pub metadata: Option<serde_json::Value>,
}

impl DocHit {
    /// Create a hit with an empty text body.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            text: String::new(),
            metadata: None,
        }
    }

    /// Set the chunk text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Attach store metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Fallback chunk text carried in metadata, if any.
    ///
    /// Ingestion sometimes leaves the text column empty and stashes the
    /// chunk under `metadata["chunk"]`; selection consults this before
    /// paying for a bulk re-fetch.
    pub fn chunk_fallback(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("chunk")?.as_str()
    }

    /// Best available text: the text column, else the metadata chunk.
    pub fn display_text(&self) -> &str {
        if self.text.is_empty() {
            self.chunk_fallback().unwrap_or("")
        } else {
            &self.text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chunk_fallback_reads_metadata() {
        let hit = DocHit::new("doc-1", 0.5)
            .with_metadata(serde_json::json!({"chunk": "stored chunk text"}));
        assert_eq!(hit.chunk_fallback(), Some("stored chunk text"));
        assert_eq!(hit.display_text(), "stored chunk text");
    }

    #[test]
    fn text_wins_over_fallback() {
        let hit = DocHit::new("doc-1", 0.5)
            .with_text("column text")
            .with_metadata(serde_json::json!({"chunk": "metadata text"}));
        assert_eq!(hit.display_text(), "column text");
    }

    #[test]
    fn missing_metadata_is_none() {
        let hit = DocHit::new("doc-1", 0.5);
        assert_eq!(hit.chunk_fallback(), None);
        assert_eq!(hit.display_text(), "");
    }
}
