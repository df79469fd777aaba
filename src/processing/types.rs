//! Core data types and error definitions for the document pipeline.

use crate::{chat::ChatClientError, embedding::EmbeddingClientError, store::StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contiguous span of extracted text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk text, at most the configured chunk size in characters.
    pub text: String,
    /// 1-based page the chunk was taken from.
    pub page: u32,
    /// Position of the chunk in the document-wide ordering.
    pub chunk_index: usize,
}

/// Text extracted from one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    /// Raw extracted text.
    pub text: String,
}

/// Errors produced while reading text out of an uploaded PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Scratch file could not be written.
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
    /// Bytes were not a readable PDF.
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),
    /// Extraction task panicked or was cancelled.
    #[error("PDF extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunk size or overlap cannot produce progress.
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfig(String),
}

/// Errors emitted while turning an upload into a persisted session.
#[derive(Debug, Error)]
pub enum IngestError {
    /// PDF could not be read.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Text could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Chunking task panicked or was cancelled.
    #[error("Chunking task failed: {0}")]
    ChunkingTask(#[from] tokio::task::JoinError),
    /// Document had no extractable text.
    #[error("Document contains no extractable text")]
    NoText,
    /// Embedding provider failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Index could not be built or persisted.
    #[error("Failed to persist vector index: {0}")]
    Store(#[from] StoreError),
}

/// Errors emitted while summarizing a freshly ingested document.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Nothing to summarize.
    #[error("No chunks available to summarize")]
    NoChunks,
    /// Chat provider failed.
    #[error(transparent)]
    Chat(#[from] ChatClientError),
}

/// Failure of the `/upload` flow, split by the stage that failed.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Extraction, embedding, or persistence failed.
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    /// The document was stored but could not be summarized.
    #[error("Summarization failed: {0}")]
    Summary(#[from] SummaryError),
}

/// Errors emitted while answering a question against a session.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Session identifier has no published index.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    /// Index could not be loaded or searched.
    #[error("Failed to read vector index: {0}")]
    Store(StoreError),
    /// Index was built with a different embedding model than the one now configured.
    #[error("Session indexed with embedding model {indexed}, but {configured} is configured")]
    ModelMismatch {
        /// Model recorded in the session index.
        indexed: String,
        /// Model of the current embedding client.
        configured: String,
    },
    /// Embedding provider failed for the question.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vector for the question.
    #[error("Embedding provider returned no vector for the query")]
    EmptyEmbedding,
    /// Chat provider failed.
    #[error(transparent)]
    Chat(#[from] ChatClientError),
}

impl From<StoreError> for QueryError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::SessionNotFound(session_id) => Self::SessionNotFound(session_id),
            other => Self::Store(other),
        }
    }
}

/// Result of ingesting one PDF.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier of the newly published session.
    pub session_id: String,
    /// Number of pages read from the PDF.
    pub page_count: usize,
    /// Chunks in document order.
    pub chunks: Vec<DocumentChunk>,
}

/// Result of the full upload flow returned to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Identifier of the newly published session.
    pub session_id: String,
    /// One-paragraph summary of the document.
    pub summary: String,
}
