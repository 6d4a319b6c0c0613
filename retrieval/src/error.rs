//! Error types for the retrieval pipeline.
//!
//! Only caller misuse surfaces as an error. Provider failures, store
//! failures, and budget exhaustion are degraded outcomes carried inside
//! [`HybridResult`](crate::HybridResult), never raised.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur when invoking the pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// A configuration field is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Rule set failed to deserialize.
    #[error("invalid rule set: {0}")]
    InvalidRules(#[from] serde_json::Error),
}
