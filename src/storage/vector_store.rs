//! Vector store abstraction and record types.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::errors::HubResult;
use crate::core::ids::RecordId;
use crate::ingest::namespace::Namespace;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Metadata stored next to each vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Chunk text.
    pub text: String,
    /// Resource the chunk came from (`github/{owner}/{repo}`, `google-drive/{id}`).
    pub resource_id: String,
    /// Provider name.
    #[serde(default)]
    pub provider: String,
    /// Position of the chunk in its document.
    #[serde(default, deserialize_with = "number_as_usize")]
    pub chunk_index: usize,
    /// Number of chunks in the document.
    #[serde(default, deserialize_with = "number_as_usize")]
    pub chunk_count: usize,
}

/// Pinecone hands metadata numbers back as floats.
fn number_as_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = value as usize;
        Ok(count)
    } else {
        Err(serde::de::Error::custom(format!("expected a count, got {value}")))
    }
}

/// One vector with its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Random record id.
    pub id: RecordId,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Metadata.
    pub metadata: RecordMetadata,
}

/// A query hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Record id.
    pub id: String,
    /// Similarity score (higher is closer).
    pub score: f32,
    /// Stored metadata, if the backend returned it.
    pub metadata: Option<RecordMetadata>,
}

/// Namespaced vector storage.
pub trait VectorStore: Send + Sync {
    /// Insert or replace records under a namespace. Returns the number written.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the write.
    fn upsert(
        &self,
        namespace: &Namespace,
        records: Vec<VectorRecord>,
    ) -> StoreFuture<'_, HubResult<usize>>;

    /// Nearest records to `vector` within a namespace, best first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    fn query(
        &self,
        namespace: &Namespace,
        vector: Vec<f32>,
        top_k: usize,
    ) -> StoreFuture<'_, HubResult<Vec<QueryMatch>>>;

    /// Remove every record under a namespace.
    ///
    /// # Errors
    /// Returns an error if the backend delete fails.
    fn delete_namespace(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<()>>;

    /// Number of records under a namespace.
    ///
    /// # Errors
    /// Returns an error if the backend cannot report counts.
    fn count(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<usize>>;

    /// Dimensionality the store accepts.
    fn ndims(&self) -> usize;
}
