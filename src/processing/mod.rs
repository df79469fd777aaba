//! Document pipeline: extraction, chunking, embedding, indexing, and generation.

pub mod chunking;
pub mod extract;
mod prompts;
mod service;
pub mod types;

pub use chunking::{CHUNK_OVERLAP_CHARS, CHUNK_SIZE_CHARS, ChunkingConfig};
pub use extract::PdfExtractor;
pub use service::{DocumentApi, RagService, ServiceInitError};
pub use types::{
    ChunkingError, DocumentChunk, ExtractionError, IngestError, IngestOutcome, PageText,
    QueryError, SummaryError, UploadError, UploadOutcome,
};
