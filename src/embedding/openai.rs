//! OpenAI-compatible `/embeddings` client.

use rig::embeddings::Embedding;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::EmbeddingConfig;
use crate::core::errors::{HubError, HubResult};
use crate::embedding::embedder::{EmbedFuture, Embedder};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SERVICE: &str = "OpenAI embeddings";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f64>,
}

/// Embedder for `POST {base_url}/embeddings`.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    ndims: usize,
}

impl OpenAiEmbedder {
    /// Create the embedder.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidConfig`] if no API key is configured.
    pub fn new(http: reqwest::Client, config: &EmbeddingConfig) -> HubResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| HubError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;
        let base = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        Ok(Self {
            http,
            endpoint: format!("{base}/embeddings"),
            api_key,
            model: config.model.clone(),
            ndims: config.ndims,
        })
    }

    async fn request(&self, texts: Vec<String>) -> HubResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: &texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HubError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let mut body: EmbeddingResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(HubError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    body.data.len()
                ),
            });
        }
        body.data.sort_by_key(|item| item.index);
        debug!(count = texts.len(), model = %self.model, "Computed embeddings");

        Ok(texts
            .into_iter()
            .zip(body.data)
            .map(|(document, item)| Embedding {
                document,
                vec: item.embedding,
            })
            .collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_text(&self, text: &str) -> EmbedFuture<'_, HubResult<Embedding>> {
        let text = text.to_string();
        Box::pin(async move {
            self.request(vec![text])
                .await?
                .pop()
                .ok_or_else(|| HubError::InvalidInput("no embedding returned".to_string()))
        })
    }

    fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, HubResult<Vec<Embedding>>> {
        Box::pin(self.request(texts))
    }

    fn ndims(&self) -> usize {
        self.ndims
    }
}
