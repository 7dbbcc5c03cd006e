//! Chunk, embed and store text under a namespace.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::AppConfig;
use crate::core::errors::{HubError, HubResult};
use crate::core::ids::RecordId;
use crate::embedding::Embedder;
use crate::ingest::chunker::TextChunker;
use crate::ingest::namespace::Namespace;
use crate::storage::{RecordMetadata, VectorRecord, VectorStore};

/// Default number of search hits.
pub const DEFAULT_TOP_K: usize = 5;
/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 100;

/// Text to ingest.
#[derive(Clone, Debug)]
pub struct IngestRequest {
    /// Full document text.
    pub text: String,
    /// Provider name stored with every chunk.
    pub provider: String,
    /// Target namespace.
    pub namespace: Namespace,
    /// Resource id stored with every chunk.
    pub resource_id: String,
}

/// Outcome of one ingest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestReport {
    /// Namespace written to.
    pub namespace: Namespace,
    /// Resource id stored with the chunks.
    pub resource_id: String,
    /// Number of chunks stored.
    pub chunk_count: usize,
    /// Ids of the stored records, in chunk order.
    pub record_ids: Vec<RecordId>,
}

/// A search result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    /// Record id.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// Chunk text.
    pub text: String,
    /// Resource the chunk came from.
    pub resource_id: String,
}

/// Chunker, embedder and vector store wired together.
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    embed_batch_size: usize,
    upsert_batch_size: usize,
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(values: Vec<f64>) -> Vec<f32> {
    values.into_iter().map(|v| v as f32).collect()
}

impl IngestPipeline {
    /// Wire a pipeline from configuration.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidConfig`] if the embedder and the store
    /// disagree on dimensionality.
    pub fn new(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> HubResult<Self> {
        if embedder.ndims() != store.ndims() {
            return Err(HubError::InvalidConfig(format!(
                "embedder produces {} dimensions but the vector store expects {}",
                embedder.ndims(),
                store.ndims()
            )));
        }
        Ok(Self {
            chunker: TextChunker::from_config(&config.chunking),
            embedder,
            store,
            embed_batch_size: config.embedding.batch_size.max(1),
            upsert_batch_size: config.vector_store.upsert_batch_size.max(1),
        })
    }

    /// Chunk the text, embed the chunks and upsert them.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidInput`] for blank text, or the embedding or
    /// storage error.
    pub async fn ingest(&self, request: IngestRequest) -> HubResult<IngestReport> {
        let chunks = self.chunker.chunk(&request.text);
        if chunks.is_empty() {
            return Err(HubError::InvalidInput("text is empty".to_string()));
        }
        let chunk_count = chunks.len();
        debug!(namespace = %request.namespace, chunks = chunk_count, "Embedding chunks");

        let mut records = Vec::with_capacity(chunk_count);
        for batch in chunks.chunks(self.embed_batch_size) {
            let embeddings = self.embedder.embed_texts(batch.to_vec()).await?;
            if embeddings.len() != batch.len() {
                return Err(HubError::Upstream {
                    service: "embedding",
                    status: 200,
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            for (text, embedding) in batch.iter().zip(embeddings) {
                let values = self.checked_vector(embedding.vec)?;
                records.push(VectorRecord {
                    id: RecordId::new(),
                    values,
                    metadata: RecordMetadata {
                        text: text.clone(),
                        resource_id: request.resource_id.clone(),
                        provider: request.provider.clone(),
                        chunk_index: records.len(),
                        chunk_count,
                    },
                });
            }
        }

        let record_ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        for batch in records.chunks(self.upsert_batch_size) {
            self.store.upsert(&request.namespace, batch.to_vec()).await?;
        }

        info!(
            namespace = %request.namespace,
            resource = %request.resource_id,
            chunks = chunk_count,
            "Embeddings created and stored"
        );
        Ok(IngestReport {
            namespace: request.namespace,
            resource_id: request.resource_id,
            chunk_count,
            record_ids,
        })
    }

    /// Nearest stored chunks to `query` within a namespace.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidInput`] for a blank query, or the embedding
    /// or storage error.
    pub async fn search(
        &self,
        namespace: &Namespace,
        query: &str,
        top_k: Option<usize>,
    ) -> HubResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(HubError::InvalidInput("query is empty".to_string()));
        }
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K);

        let embedding = self.embedder.embed_text(query).await?;
        let vector = self.checked_vector(embedding.vec)?;
        let matches = self.store.query(namespace, vector, top_k).await?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let (text, resource_id) = m
                    .metadata
                    .map(|meta| (meta.text, meta.resource_id))
                    .unwrap_or_default();
                SearchHit {
                    id: m.id,
                    score: m.score,
                    text,
                    resource_id,
                }
            })
            .collect())
    }

    /// Remove everything stored under a namespace.
    ///
    /// # Errors
    /// Returns the storage error.
    pub async fn delete_namespace(&self, namespace: &Namespace) -> HubResult<()> {
        self.store.delete_namespace(namespace).await
    }

    /// Records stored under a namespace.
    ///
    /// # Errors
    /// Returns the storage error.
    pub async fn count(&self, namespace: &Namespace) -> HubResult<usize> {
        self.store.count(namespace).await
    }

    fn checked_vector(&self, values: Vec<f64>) -> HubResult<Vec<f32>> {
        let expected = self.embedder.ndims();
        if values.len() != expected {
            return Err(HubError::DimensionMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(to_f32(values))
    }
}
