//! Session-scoped vector index persistence.

pub mod index;
pub mod sessions;
pub mod types;

pub use index::{DEFAULT_TOP_K, IndexEntry, ScoredChunk, VectorIndex};
pub use sessions::{INDEX_FILE_NAME, SessionStore, SweepReport, spawn_session_sweeper};
pub use types::StoreError;
