//! Embedding model abstraction and the Rig + Ollama implementation.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client as ReqwestClient;
use rig::client::{EmbeddingsClient, Nothing};
use rig::embeddings::{Embedding, EmbeddingModel};
use rig::providers::ollama;
use tracing::debug;

use crate::core::config::EmbeddingConfig;
use crate::core::errors::{HubError, HubResult};

/// Boxed future type for embedder operations.
pub type EmbedFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstraction over embedding models.
pub trait Embedder: Send + Sync {
    /// Embed a single text string.
    ///
    /// # Errors
    /// Returns an error if the embedding request fails.
    fn embed_text(&self, text: &str) -> EmbedFuture<'_, HubResult<Embedding>>;
    /// Embed multiple texts, in input order.
    ///
    /// # Errors
    /// Returns an error if the embedding request fails.
    fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, HubResult<Vec<Embedding>>>;
    /// Return embedding dimensionality.
    fn ndims(&self) -> usize;
}

type OllamaEmbeddingModel = ollama::EmbeddingModel<ReqwestClient>;

/// Ollama embedder using Rig provider.
#[derive(Clone)]
pub struct OllamaEmbedder {
    model: OllamaEmbeddingModel,
    ndims: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder from config.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> HubResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder.build().map_err(HubError::from)?;
        let model = client.embedding_model_with_ndims(config.model.clone(), config.ndims);
        Ok(Self {
            model,
            ndims: config.ndims,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed_text(&self, text: &str) -> EmbedFuture<'_, HubResult<Embedding>> {
        let texts = vec![text.to_string()];
        Box::pin(async move {
            self.embed_texts(texts)
                .await?
                .pop()
                .ok_or_else(|| HubError::InvalidInput("no embedding returned".to_string()))
        })
    }

    fn embed_texts(&self, texts: Vec<String>) -> EmbedFuture<'_, HubResult<Vec<Embedding>>> {
        Box::pin(async move {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let expected = texts.len();
            let embeddings = self
                .model
                .embed_texts(texts)
                .await
                .map_err(HubError::Embedding)?;
            let embeddings = check_batch(expected, self.ndims, embeddings)?;
            debug!(count = expected, "Computed Ollama embeddings");
            Ok(embeddings)
        })
    }

    fn ndims(&self) -> usize {
        self.ndims
    }
}

/// Reject a short batch, or vectors whose width is not `ndims`.
fn check_batch(
    expected: usize,
    ndims: usize,
    embeddings: Vec<Embedding>,
) -> HubResult<Vec<Embedding>> {
    if embeddings.len() != expected {
        return Err(HubError::Upstream {
            service: "ollama",
            status: 200,
            message: format!("expected {expected} embeddings, got {}", embeddings.len()),
        });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.vec.len() != ndims) {
        return Err(HubError::DimensionMismatch {
            expected: ndims,
            got: bad.vec.len(),
        });
    }
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EmbeddingProvider;

    #[test]
    fn test_ollama_embedder_builds_offline() {
        let config = EmbeddingConfig {
            base_url: Some("http://127.0.0.1:11434".to_string()),
            ..EmbeddingConfig::for_provider(EmbeddingProvider::Ollama)
        };
        let embedder = OllamaEmbedder::new(&config);
        assert_eq!(embedder.map(|e| e.ndims()).ok(), Some(768));
    }

    fn embedding(document: &str, vec: Vec<f64>) -> Embedding {
        Embedding {
            document: document.to_string(),
            vec,
        }
    }

    #[test]
    fn test_check_batch() {
        let batch = vec![embedding("a", vec![0.1, 0.2]), embedding("b", vec![0.3, 0.4])];
        assert_eq!(check_batch(2, 2, batch).unwrap().len(), 2);

        let short = vec![embedding("a", vec![0.1, 0.2])];
        assert!(matches!(
            check_batch(2, 2, short),
            Err(HubError::Upstream { service: "ollama", .. })
        ));

        let wide = vec![embedding("a", vec![0.1, 0.2]), embedding("b", vec![0.3, 0.4, 0.5])];
        assert!(matches!(
            check_batch(2, 2, wide),
            Err(HubError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }
}
