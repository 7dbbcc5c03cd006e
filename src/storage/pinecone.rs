//! Pinecone data-plane REST client.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::core::config::VectorStoreConfig;
use crate::core::errors::{HubError, HubResult};
use crate::ingest::namespace::Namespace;
use crate::storage::vector_store::{
    QueryMatch, RecordMetadata, StoreFuture, VectorRecord, VectorStore,
};

const SERVICE: &str = "Pinecone";

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: &'a RecordMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

/// Vector store backed by a Pinecone index.
pub struct PineconeStore {
    http: reqwest::Client,
    host: String,
    api_key: String,
    api_version: String,
    ndims: usize,
}

impl PineconeStore {
    /// Create the store.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidConfig`] if the API key or index host is missing.
    pub fn new(http: reqwest::Client, config: &VectorStoreConfig, ndims: usize) -> HubResult<Self> {
        let api_key = config
            .pinecone_api_key
            .clone()
            .ok_or_else(|| HubError::InvalidConfig("PINECONE_API_KEY is not set".to_string()))?;
        let host = config
            .pinecone_index_host
            .clone()
            .ok_or_else(|| HubError::InvalidConfig("PINECONE_INDEX_HOST is not set".to_string()))?;
        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.pinecone_api_version.clone(),
            ndims,
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> HubResult<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(HubError::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            message,
        })
    }
}

impl VectorStore for PineconeStore {
    fn upsert(
        &self,
        namespace: &Namespace,
        records: Vec<VectorRecord>,
    ) -> StoreFuture<'_, HubResult<usize>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            if records.is_empty() {
                return Ok(0);
            }
            for record in &records {
                if record.values.len() != self.ndims {
                    return Err(HubError::DimensionMismatch {
                        expected: self.ndims,
                        got: record.values.len(),
                    });
                }
            }

            let vectors: Vec<PineconeVector<'_>> = records
                .iter()
                .map(|record| PineconeVector {
                    id: record.id.to_string(),
                    values: &record.values,
                    metadata: &record.metadata,
                })
                .collect();
            let body = json!({ "vectors": vectors, "namespace": namespace });
            let response: UpsertResponse = self.post("/vectors/upsert", &body).await?.json().await?;
            debug!(namespace = %namespace, upserted = response.upserted_count, "Pinecone upsert");
            Ok(response.upserted_count)
        })
    }

    fn query(
        &self,
        namespace: &Namespace,
        vector: Vec<f32>,
        top_k: usize,
    ) -> StoreFuture<'_, HubResult<Vec<QueryMatch>>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let body = json!({
                "namespace": namespace,
                "vector": vector,
                "topK": top_k.max(1),
                "includeMetadata": true,
                "includeValues": false,
            });
            let response: QueryResponse = self.post("/query", &body).await?.json().await?;
            Ok(response.matches)
        })
    }

    fn delete_namespace(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<()>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let body = json!({ "deleteAll": true, "namespace": namespace });
            match self.post("/vectors/delete", &body).await {
                Ok(_) | Err(HubError::Upstream { status: 404, .. }) => {
                    info!(namespace = %namespace, "Deleted Pinecone namespace");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        })
    }

    fn count(&self, namespace: &Namespace) -> StoreFuture<'_, HubResult<usize>> {
        let namespace = namespace.as_str().to_string();
        Box::pin(async move {
            let stats: IndexStats = self
                .post("/describe_index_stats", &json!({}))
                .await?
                .json()
                .await?;
            Ok(stats
                .namespaces
                .get(&namespace)
                .map_or(0, |ns| ns.vector_count))
        })
    }

    fn ndims(&self) -> usize {
        self.ndims
    }
}
