//! # Trawl Retrieval
//!
//! The budget-bounded hybrid retrieval pipeline: a single-shot operation
//! that answers one query against a mixed corpus and degrades gracefully
//! when any dependency is slow or down.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Hybrid Retrieval Engine                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  Query ──► Expander ──► ┌──────────┬─────────┬─────────┬─────┐  │
//! │                         │  Dense   │ Lexical │ Keyword │BM25 │  │
//! │                         └────┬─────┴────┬────┴────┬────┴──┬──┘  │
//! │                              └──────────┴─────────┴───────┘     │
//! │                                         ▼                       │
//! │                                  RRF Fusion                     │
//! │                                         ▼                       │
//! │                             Heuristic Re-scoring                │
//! │                                         ▼                       │
//! │                                MMR Selection                    │
//! │                                         ▼                       │
//! │                     (optional) LLM Rerank / Answer              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage runs under one wall-clock [`Budget`]; exhaustion truncates
//! the pipeline instead of failing it. The only error the caller can see
//! is an invalid [`HybridConfig`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trawl_corpus::ScopeFilter;
//! use trawl_retrieval::{HybridConfig, HybridRetrieval};
//!
//! let engine = HybridRetrieval::builder(store)
//!     .with_embeddings(embeddings)
//!     .with_completions(completions)
//!     .build()?;
//!
//! let result = engine.search("diesel supply terms", &ScopeFilter::all()).await?;
//! let answer = engine.answer(&result).await;
//! ```

pub mod answer;
pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod expand;
pub mod fusion;
pub mod mmr;
pub mod progress;
pub mod rerank;
pub mod rescore;
pub mod result;
pub mod rules;
pub mod strategies;

pub use answer::{AnswerSection, StructuredAnswer};
pub use budget::Budget;
pub use config::HybridConfig;
pub use engine::{HybridRetrieval, HybridRetrievalBuilder};
pub use error::{Result, RetrievalError};
pub use progress::{Phase, ProgressReporter, ProgressUpdate};
pub use result::{FusedScore, HybridResult};
pub use rules::{NoiseRule, RuleSet, SynonymRule, Weights};

// Re-export from dependencies for convenience
pub use trawl_corpus::{CorpusStore, DocHit, ScopeFilter};
pub use trawl_providers::{CompletionProvider, EmbeddingProvider};
pub use trawl_text::{detect_language, DetectedLanguage};
