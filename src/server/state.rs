//! Application state shared across all request handlers.

use std::sync::Arc;

use tracing::info;

use crate::auth::{OAuthClient, SessionStore};
use crate::core::config::AppConfig;
use crate::core::errors::HubResult;
use crate::embedding::{Embedder, build_embedder};
use crate::ingest::IngestPipeline;
use crate::sources::drive::DriveClient;
use crate::sources::github::GithubClient;
use crate::sources::http::build_client;
use crate::storage::{VectorStore, open_vector_store};

/// Shared application state.
pub struct AppState {
    /// Validated configuration.
    pub config: AppConfig,
    /// Sessions and pending logins.
    pub sessions: Arc<SessionStore>,
    /// OAuth flow.
    pub oauth: OAuthClient,
    /// GitHub REST client.
    pub github: GithubClient,
    /// Google Drive REST client.
    pub drive: DriveClient,
    /// Chunk, embed and store.
    pub pipeline: IngestPipeline,
}

impl AppState {
    /// Build the state, connecting the configured embedder and vector store.
    ///
    /// # Errors
    /// Returns an error if a client cannot be built or the store cannot be opened.
    pub async fn new(config: AppConfig) -> HubResult<Arc<Self>> {
        let http = build_client(&config.sources)?;
        let embedder = build_embedder(http.clone(), &config.embedding)?;
        let store = open_vector_store(http, &config.vector_store, config.embedding.ndims).await?;
        info!(
            embedding = ?config.embedding.provider,
            model = %config.embedding.model,
            vector_store = ?config.vector_store.backend,
            "Backends ready"
        );
        Self::with_backends(config, embedder, store)
    }

    /// Build the state around explicit backends.
    ///
    /// # Errors
    /// Returns an error if a client cannot be built or the backends disagree
    /// on dimensionality.
    pub fn with_backends(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> HubResult<Arc<Self>> {
        let http = build_client(&config.sources)?;
        let pipeline = IngestPipeline::new(&config, embedder, store)?;
        Ok(Arc::new(Self {
            sessions: Arc::new(SessionStore::new(&config.auth)),
            oauth: OAuthClient::new(http, config.auth.clone(), &config.server.public_url),
            github: GithubClient::new(&config.sources)?,
            drive: DriveClient::new(&config.sources)?,
            pipeline,
            config,
        }))
    }
}
