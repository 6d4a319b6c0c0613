//! The outcome of one hybrid retrieval call.

use serde::{Deserialize, Serialize};

use trawl_corpus::DocHit;
use trawl_text::DetectedLanguage;

/// A fused id and its RRF score, kept for diagnostics and citation UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedScore {
    /// Candidate id.
    pub id: String,

    /// Summed reciprocal-rank score.
    pub score: f32,
}

/// Everything one retrieval call produced.
///
/// Returned for every invocation that passes config validation: provider
/// failures, store failures, and budget exhaustion degrade the contents
/// (possibly to an empty `selected`) but never replace the result with an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridResult {
    /// The original query.
    pub query: String,

    /// Detected query language.
    pub language: DetectedLanguage,

    /// Query variants actually used, the original first.
    pub expansions: Vec<String>,

    /// Final diversified selection, at most `final_k` hits.
    pub selected: Vec<DocHit>,

    /// The fusion pool before re-scoring and selection.
    pub fused: Vec<FusedScore>,

    /// Whether any stage was skipped or truncated by the budget.
    pub budget_hit: bool,

    /// Wall-clock time of the whole call.
    pub elapsed_ms: u64,
}
