//! Embedding backends.

pub mod embedder;
pub mod openai;

use std::sync::Arc;

use crate::core::config::{EmbeddingConfig, EmbeddingProvider};
use crate::core::errors::HubResult;

pub use embedder::{EmbedFuture, Embedder, OllamaEmbedder};
pub use openai::OpenAiEmbedder;

/// Build the configured embedder.
///
/// # Errors
/// Returns an error if the backend cannot be configured.
pub fn build_embedder(
    http: reqwest::Client,
    config: &EmbeddingConfig,
) -> HubResult<Arc<dyn Embedder>> {
    Ok(match config.provider {
        EmbeddingProvider::OpenAi => Arc::new(OpenAiEmbedder::new(http, config)?),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(config)?),
    })
}
