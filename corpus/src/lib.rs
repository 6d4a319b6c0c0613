//! # Trawl Corpus
//!
//! The corpus side of the retrieval pipeline: the `DocHit` unit that flows
//! between stages, the async [`CorpusStore`] seam the strategies query
//! through, and the two pieces of process-wide state the design allows —
//! the store capability cache and the local BM25 index cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Corpus Layer                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CorpusStore ──► SchemaCache (resolved once)                    │
//! │      │      └──► LocalIndexCache (TTL, single-flight)           │
//! │      ▼                                                          │
//! │  MemoryStore / SQL-backed adapters                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores never interpret retrieval semantics; they answer similarity,
//! pattern, full-text, fetch, and sampling queries and forward scope
//! filters opaquely.

pub mod error;
pub mod hit;
pub mod local_index;
pub mod memory;
pub mod schema;
pub mod scope;
pub mod store;

pub use error::{Result, StoreError};
pub use hit::DocHit;
pub use local_index::LocalIndexCache;
pub use memory::{MemoryDoc, MemoryStore};
pub use schema::SchemaCache;
pub use scope::ScopeFilter;
pub use store::{CorpusStore, StoreCapabilities};
