//! Error types for corpus stores.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur when querying a corpus store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A query against the backing store failed.
    #[error("store query failed: {0}")]
    Query(String),

    /// The store lacks a capability the caller asked for.
    #[error("store capability missing: {0}")]
    Unsupported(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
