//! Vector storage backends.

pub mod pinecone;
pub mod sqlite_store;
pub mod sqlite_vec_loader;
pub mod vector_store;

use std::sync::Arc;

use crate::core::config::{VectorBackend, VectorStoreConfig};
use crate::core::errors::HubResult;

pub use pinecone::PineconeStore;
pub use sqlite_store::SqliteVectorStore;
pub use sqlite_vec_loader::init_sqlite_vec_extension;
pub use vector_store::{QueryMatch, RecordMetadata, StoreFuture, VectorRecord, VectorStore};

/// Open the configured vector store.
///
/// # Errors
/// Returns an error if the backend cannot be reached or initialised.
pub async fn open_vector_store(
    http: reqwest::Client,
    config: &VectorStoreConfig,
    ndims: usize,
) -> HubResult<Arc<dyn VectorStore>> {
    Ok(match config.backend {
        VectorBackend::Pinecone => Arc::new(PineconeStore::new(http, config, ndims)?),
        VectorBackend::Sqlite => {
            init_sqlite_vec_extension();
            Arc::new(SqliteVectorStore::open(config, ndims).await?)
        }
    })
}
