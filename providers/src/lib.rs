//! # Trawl Providers
//!
//! External model providers consumed by the retrieval pipeline: embedding
//! generation for dense search and chat completions for query expansion,
//! reranking, and answer synthesis.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Provider Layer                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► CachedEmbeddings (TTL cache)             │
//! │  CompletionProvider ──► JSON-tolerant call sites                │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  OpenAI-style HTTP APIs (reqwest)                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call site in the pipeline treats these providers as unreliable:
//! errors surface as typed [`ProviderError`]s and the pipeline degrades
//! rather than propagating them.

pub mod cache;
pub mod completion;
pub mod embedding;
pub mod error;
pub mod similarity;

pub use cache::{CachedEmbeddings, EmbeddingCache};
pub use completion::{extract_json_array, CompletionProvider, CompletionRequest, OpenAiCompletions};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAiEmbeddings};
pub use error::{ProviderError, Result};
pub use similarity::cosine_similarity;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default embedding dimension (OpenAI text-embedding-3-small).
pub const DEFAULT_DIMENSION: usize = 1536;
