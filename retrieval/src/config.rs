//! Per-invocation pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Configuration for one hybrid retrieval call.
///
/// Immutable once the call starts; the engine holds process-wide defaults
/// and callers override fields per invocation with the `with_*` builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Final number of hits returned.
    pub final_k: usize,

    /// Dense fetch size per expansion.
    pub dense_k: usize,

    /// Fusion pool size.
    pub dense_fuse: usize,

    /// Lexical/BM25 fetch size per query.
    pub lexical_k: usize,

    /// Maximum expansions beyond the original query.
    pub expansion_count: usize,

    /// MMR relevance/diversity trade-off, 0..=1. Higher favors relevance.
    pub mmr_lambda: f32,

    /// Whether the BM25 strategy runs at all.
    pub use_bm25: bool,

    /// Whether the keyword prefilter strategy runs.
    pub keyword_prefilter: bool,

    /// Id prefix whose hits receive the domain boost.
    pub prefer_domain: Option<String>,

    /// Wall-clock ceiling for the whole call, in milliseconds.
    pub budget_ms: u64,

    /// Whether the LLM rerank step runs when a completion provider is
    /// attached and budget remains.
    pub llm_rerank: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            final_k: 6,
            dense_k: 8,
            dense_fuse: 10,
            lexical_k: 12,
            expansion_count: 4,
            mmr_lambda: 0.7,
            use_bm25: true,
            keyword_prefilter: true,
            prefer_domain: None,
            budget_ms: 2_500,
            llm_rerank: true,
        }
    }
}

impl HybridConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the final hit count.
    pub fn with_final_k(mut self, final_k: usize) -> Self {
        self.final_k = final_k;
        self
    }

    /// Set the per-expansion dense fetch size.
    pub fn with_dense_k(mut self, dense_k: usize) -> Self {
        self.dense_k = dense_k;
        self
    }

    /// Set the fusion pool size.
    pub fn with_dense_fuse(mut self, dense_fuse: usize) -> Self {
        self.dense_fuse = dense_fuse;
        self
    }

    /// Set the lexical fetch size.
    pub fn with_lexical_k(mut self, lexical_k: usize) -> Self {
        self.lexical_k = lexical_k;
        self
    }

    /// Set the expansion cap.
    pub fn with_expansion_count(mut self, expansion_count: usize) -> Self {
        self.expansion_count = expansion_count;
        self
    }

    /// Set the MMR lambda.
    pub fn with_mmr_lambda(mut self, mmr_lambda: f32) -> Self {
        self.mmr_lambda = mmr_lambda;
        self
    }

    /// Enable or disable BM25.
    pub fn with_bm25(mut self, use_bm25: bool) -> Self {
        self.use_bm25 = use_bm25;
        self
    }

    /// Enable or disable the keyword prefilter.
    pub fn with_keyword_prefilter(mut self, keyword_prefilter: bool) -> Self {
        self.keyword_prefilter = keyword_prefilter;
        self
    }

    /// Set the preferred domain id prefix.
    pub fn with_prefer_domain(mut self, prefix: impl Into<String>) -> Self {
        self.prefer_domain = Some(prefix.into());
        self
    }

    /// Set the wall-clock budget.
    pub fn with_budget_ms(mut self, budget_ms: u64) -> Self {
        self.budget_ms = budget_ms;
        self
    }

    /// Enable or disable the LLM rerank step.
    pub fn with_llm_rerank(mut self, llm_rerank: bool) -> Self {
        self.llm_rerank = llm_rerank;
        self
    }

    /// Fail fast on caller misuse. Everything else in the pipeline degrades
    /// instead of erroring, so this is the one place limits are checked.
    pub fn validate(&self) -> Result<()> {
        if self.final_k == 0 {
            return Err(RetrievalError::InvalidConfig("final_k must be > 0".into()));
        }
        if self.dense_k == 0 || self.dense_fuse == 0 || self.lexical_k == 0 {
            return Err(RetrievalError::InvalidConfig(
                "fetch sizes must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(RetrievalError::InvalidConfig(
                "mmr_lambda must be in 0..=1".into(),
            ));
        }
        if self.budget_ms == 0 {
            return Err(RetrievalError::InvalidConfig("budget_ms must be > 0".into()));
        }
        Ok(())
    }
}
