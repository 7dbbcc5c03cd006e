//! Core types: configuration, errors, identifiers and providers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod provider;

pub use config::{
    AppConfig, AuthConfig, ChunkingConfig, EmbeddingConfig, EmbeddingProvider, OAuthClientConfig,
    OAuthEndpoints, ServerConfig, SourcesConfig, VectorBackend, VectorStoreConfig,
};
pub use errors::{HubError, HubResult};
pub use ids::{RecordId, SessionId};
pub use provider::{Provider, UnknownProvider};
