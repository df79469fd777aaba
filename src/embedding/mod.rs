//! Embedding client abstraction and the Cohere adapter.
//!
//! Documents and queries are embedded with different `input_type` hints, which Cohere's v3
//! models require to place both in the same retrieval space.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cohere rejects embed requests with more texts than this.
const MAX_TEXTS_PER_REQUEST: usize = 96;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or did not match the request.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// How the embedded text will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingInput {
    /// Chunk text stored in the vector index.
    SearchDocument,
    /// Question text used to search the index.
    SearchQuery,
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        input: EmbeddingInput,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;
}

/// Cohere `/v1/embed` client.
pub struct CohereEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereEmbeddingClient {
    /// Construct a client from the process configuration.
    pub fn new(config: &Config) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("askpdf/embed")
            .timeout(config.provider_timeout)
            .build()
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to build HTTP client: {error}"
                ))
            })?;
        tracing::debug!(
            url = %config.cohere_base_url,
            model = %config.embedding_model,
            "Initialized Cohere embedding client"
        );
        Ok(Self {
            http,
            base_url: config.cohere_base_url.clone(),
            api_key: config.cohere_api_key.clone(),
            model: config.embedding_model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        input: EmbeddingInput,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let payload = EmbedRequest {
            texts,
            model: &self.model,
            input_type: input,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Cohere at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(EmbeddingClientError::GenerationFailed(
                "Cohere rejected the API key".into(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Cohere returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Cohere response: {error}"
            ))
        })?;

        if body.embeddings.len() != texts.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: EmbeddingInput,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for CohereEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
        input: EmbeddingInput,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.model,
            texts = texts.len(),
            input = ?input,
            "Generating embeddings"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_TEXTS_PER_REQUEST) {
            embeddings.extend(self.embed_batch(batch, input).await?);
        }
        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
