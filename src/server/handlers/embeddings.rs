//! Generic embedding routes: create, search and delete by namespace.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::provider::{Provider, UnknownProvider};
use crate::ingest::{IngestReport, IngestRequest, Namespace, SearchHit};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::require_session;
use crate::server::state::AppState;

/// Body of `POST /api/embeddings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmbeddingsRequest {
    /// Text to chunk and embed.
    pub text: String,
    /// Provider the text came from.
    pub provider: String,
    /// Target namespace.
    pub namespace: String,
    /// Resource the text belongs to.
    #[serde(alias = "resource_id")]
    pub resource_id: String,
}

/// Response of `POST /api/embeddings`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEmbeddingsResponse {
    /// Summary.
    pub message: String,
    /// What was stored.
    #[serde(flatten)]
    pub report: IngestReport,
}

/// Chunk, embed and store one text.
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateEmbeddingsRequest>,
) -> ApiResult<Json<CreateEmbeddingsResponse>> {
    require_session(&state, &headers)?;
    let provider: Provider = request
        .provider
        .parse()
        .map_err(|err: UnknownProvider| ApiError::bad_request(err.to_string()))?;
    if request.resource_id.trim().is_empty() {
        return Err(ApiError::bad_request("resourceId must not be empty"));
    }
    let namespace = Namespace::new(request.namespace)?;

    let report = state
        .pipeline
        .ingest(IngestRequest {
            text: request.text,
            provider: provider.as_str().to_string(),
            namespace,
            resource_id: request.resource_id.trim().to_string(),
        })
        .await?;

    Ok(Json(CreateEmbeddingsResponse {
        message: "Embeddings created and stored successfully".to_string(),
        report,
    }))
}

/// Body of `POST /api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Namespace to search.
    pub namespace: String,
    /// Query text.
    pub query: String,
    /// Number of hits, default 5.
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Nearest stored chunks to a query.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    require_session(&state, &headers)?;
    let namespace = Namespace::new(request.namespace)?;
    let hits = state
        .pipeline
        .search(&namespace, &request.query, request.top_k)
        .await?;
    Ok(Json(hits))
}

/// Remove everything stored under a namespace.
pub async fn delete_namespace(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(namespace): Path<String>,
) -> ApiResult<StatusCode> {
    require_session(&state, &headers)?;
    let namespace = Namespace::new(namespace)?;
    state.pipeline.delete_namespace(&namespace).await?;
    Ok(StatusCode::NO_CONTENT)
}
