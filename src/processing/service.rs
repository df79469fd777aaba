//! RAG service coordinating extraction, chunking, embedding, storage, and generation.

use crate::{
    chat::{AnthropicChatClient, ChatClient, ChatClientError, ChatRequest},
    config::Config,
    embedding::{CohereEmbeddingClient, EmbeddingClient, EmbeddingClientError, EmbeddingInput},
    processing::{
        chunking::{ChunkingConfig, chunk_pages},
        extract::PdfExtractor,
        prompts::{ANSWER_TEMPERATURE, SUMMARY_TEMPERATURE, answer_prompt, summary_prompt},
        types::{
            DocumentChunk, IngestError, IngestOutcome, QueryError, SummaryError, UploadError,
            UploadOutcome,
        },
    },
    store::{DEFAULT_TOP_K, SessionStore, StoreError, VectorIndex},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring the service at startup.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Embedding client could not be constructed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Chat client could not be constructed.
    #[error(transparent)]
    Chat(#[from] ChatClientError),
    /// Session store root could not be created.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Upload, summarize, and answer questions about PDFs.
///
/// The service holds no per-request state: every query reloads its session's index from the
/// [`SessionStore`]. Share one instance through an `Arc`.
pub struct RagService {
    embedding_client: Arc<dyn EmbeddingClient>,
    chat_client: Arc<dyn ChatClient>,
    store: SessionStore,
    extractor: PdfExtractor,
    chunking: ChunkingConfig,
    top_k: usize,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Ingest a PDF into a new session and summarize it.
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, UploadError>;

    /// Answer `question` from the session's document.
    async fn query(&self, session_id: &str, question: &str) -> Result<String, QueryError>;
}

impl RagService {
    /// Assemble a service from already-built components.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        chat_client: Arc<dyn ChatClient>,
        store: SessionStore,
    ) -> Self {
        Self {
            embedding_client,
            chat_client,
            store,
            extractor: PdfExtractor::default(),
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Build the Cohere/Anthropic-backed service described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!("Initializing provider clients");
        let embedding_client = Arc::new(CohereEmbeddingClient::new(config)?);
        let chat_client = Arc::new(AnthropicChatClient::new(config)?);
        let store = SessionStore::open(&config.vector_store_dir).await?;
        Ok(Self::new(embedding_client, chat_client, store))
    }

    /// Stage uploads somewhere other than the system temp directory.
    pub fn with_extractor(mut self, extractor: PdfExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Session store backing this service.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Extract, chunk, embed, and persist a PDF as a new session.
    pub async fn ingest(&self, bytes: Vec<u8>) -> Result<IngestOutcome, IngestError> {
        let pages = self.extractor.extract_pages(bytes).await?;
        let page_count = pages.len();
        let chunking = self.chunking;
        let chunks = tokio::task::spawn_blocking(move || chunk_pages(&pages, chunking)).await??;
        if chunks.is_empty() {
            return Err(IngestError::NoText);
        }
        tracing::debug!(pages = page_count, chunks = chunks.len(), "Document chunked");

        let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self
            .embedding_client
            .generate_embeddings(texts, EmbeddingInput::SearchDocument)
            .await?;

        let index = VectorIndex::build(self.embedding_client.model(), chunks.clone(), vectors)?;
        let session_id = self.store.create(&index).await?;

        tracing::info!(
            session_id = %session_id,
            pages = page_count,
            chunks = chunks.len(),
            dimension = index.dimension(),
            "Document indexed"
        );

        Ok(IngestOutcome {
            session_id,
            page_count,
            chunks,
        })
    }

    /// Produce a one-paragraph summary from the document's leading chunks.
    pub async fn summarize(&self, chunks: &[DocumentChunk]) -> Result<String, SummaryError> {
        if chunks.is_empty() {
            return Err(SummaryError::NoChunks);
        }
        let summary = self
            .chat_client
            .complete(ChatRequest {
                prompt: summary_prompt(chunks),
                temperature: SUMMARY_TEMPERATURE,
            })
            .await?;
        tracing::debug!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }

    /// Retrieve the chunks nearest to `question` and answer from them.
    pub async fn query(&self, session_id: &str, question: &str) -> Result<String, QueryError> {
        let index = self.store.load(session_id).await?;
        if index.model() != self.embedding_client.model() {
            return Err(QueryError::ModelMismatch {
                indexed: index.model().to_string(),
                configured: self.embedding_client.model().to_string(),
            });
        }

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()], EmbeddingInput::SearchQuery)
            .await?;
        let vector = vectors.pop().ok_or(QueryError::EmptyEmbedding)?;

        let hits = index.search(&vector, self.top_k)?;
        tracing::debug!(
            session_id,
            hits = hits.len(),
            pages = ?hits.iter().map(|hit| hit.chunk.page).collect::<Vec<_>>(),
            "Retrieved context"
        );

        let answer = self
            .chat_client
            .complete(ChatRequest {
                prompt: answer_prompt(hits.iter().map(|hit| hit.chunk), question),
                temperature: ANSWER_TEMPERATURE,
            })
            .await?;

        tracing::info!(session_id, context_chunks = hits.len(), "Query answered");
        Ok(answer)
    }
}

#[async_trait]
impl DocumentApi for RagService {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome, UploadError> {
        tracing::info!(filename, bytes = bytes.len(), "Processing upload");
        let IngestOutcome {
            session_id, chunks, ..
        } = self.ingest(bytes).await?;
        let summary = self.summarize(&chunks).await?;
        Ok(UploadOutcome {
            session_id,
            summary,
        })
    }

    async fn query(&self, session_id: &str, question: &str) -> Result<String, QueryError> {
        RagService::query(self, session_id, question).await
    }
}
