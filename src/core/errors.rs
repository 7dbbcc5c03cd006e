//! Error types shared by the ingest, embedding and storage layers.

use thiserror::Error;

use crate::sources::error::SourceError;

/// EmbedHub error type.
#[derive(Debug, Error)]
pub enum HubError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Caller supplied unusable input.
    #[error("{0}")]
    InvalidInput(String),
    /// No usable session or provider token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// GitHub or Google Drive request failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A third-party API (embeddings, vector store, OAuth) answered with an error status.
    #[error("{service} returned status {status}: {message}")]
    Upstream {
        /// Which service failed.
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Error body or summary.
        message: String,
    },
    /// Transport-level HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Embedding error from rig.
    #[error("embedding error: {0}")]
    Embedding(#[from] rig::embeddings::EmbeddingError),
    /// HTTP client error from rig.
    #[error("http client error: {0}")]
    HttpClient(#[from] rig::http_client::Error),
    /// Embedding vector has the wrong dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Dimensionality returned by the model.
        got: usize,
    },
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias.
pub type HubResult<T> = Result<T, HubError>;
