//! # Trawl Text
//!
//! Text-side building blocks for the hybrid retrieval pipeline: cleanup of
//! scraped/OCR'd chunk text, query language detection, tokenizers shared by
//! the lexical strategies, and a self-contained BM25 index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Text Utilities                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Normalizer ──► tokenize ──► Bm25Index                          │
//! │      │              │            │                              │
//! │      ▼              ▼            ▼                              │
//! │  clean chunks   query tokens  lexical ranking                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure and synchronous; the async layers live in the
//! provider and retrieval crates.

pub mod bm25;
pub mod language;
pub mod normalize;
pub mod tokenize;

pub use bm25::{Bm25Index, Bm25Match, BM25_B, BM25_K1};
pub use language::{detect_language, DetectedLanguage, Script};
pub use normalize::Normalizer;
pub use tokenize::{bm25_tokens, significant_tokens, similarity_token_set, token_jaccard};
