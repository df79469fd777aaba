//! Error type shared by the index and session store.

use thiserror::Error;

/// Errors returned while building, persisting, or loading a vector index.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No published index exists for the requested session identifier.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    /// Filesystem operation failed.
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Index file could not be encoded or decoded.
    #[error("Failed to serialize vector index: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Index contents violate a structural invariant.
    #[error("Invalid vector index: {0}")]
    InvalidIndex(String),
    /// Blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
