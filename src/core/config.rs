//! Configuration for the EmbedHub service.
//!
//! Every section has a `Default` suitable for local development; the
//! deployment values come from environment variables (see [`AppConfig::from_env`]).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{HubError, HubResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// OAuth and session settings.
    pub auth: AuthConfig,
    /// GitHub / Google Drive client settings.
    pub sources: SourcesConfig,
    /// Text chunking settings.
    pub chunking: ChunkingConfig,
    /// Embedding model settings.
    pub embedding: EmbeddingConfig,
    /// Vector store settings.
    pub vector_store: VectorStoreConfig,
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable is present but cannot be parsed, or if
    /// the resulting configuration fails [`AppConfig::validate`].
    pub fn from_env() -> HubResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> HubResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(port) = parse_var(&get, "EMBEDHUB_PORT")? {
            config.server.port = port;
        }
        if let Some(url) = get("EMBEDHUB_PUBLIC_URL") {
            config.server.public_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = get("EMBEDHUB_STATIC_DIR") {
            config.server.static_dir = PathBuf::from(dir);
        }

        config.auth.github = oauth_client(&get, "GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET");
        config.auth.google = oauth_client(&get, "GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET");
        if let Some(ttl) = parse_var(&get, "EMBEDHUB_SESSION_TTL_SECS")? {
            config.auth.session_ttl_seconds = ttl;
        }
        config.auth.secure_cookies = config.server.public_url.starts_with("https://");

        if let Some(url) = get("EMBEDHUB_GITHUB_API_URL") {
            config.sources.github_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("EMBEDHUB_DRIVE_API_URL") {
            config.sources.drive_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(concurrency) = parse_var(&get, "EMBEDHUB_FETCH_CONCURRENCY")? {
            config.sources.fetch_concurrency = concurrency;
        }
        if let Some(max_bytes) = parse_var(&get, "EMBEDHUB_MAX_FILE_BYTES")? {
            config.sources.max_file_bytes = max_bytes;
        }
        if let Some(list) = get("EMBEDHUB_DISABLED_EXTENSIONS") {
            config.sources.disabled_extensions = list
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
        }

        if let Some(size) = parse_var(&get, "EMBEDHUB_CHUNK_SIZE")? {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = parse_var(&get, "EMBEDHUB_CHUNK_OVERLAP")? {
            config.chunking.overlap = overlap;
        }

        if let Some(provider) = parse_var::<EmbeddingProvider>(&get, "EMBEDHUB_EMBEDDING_PROVIDER")? {
            config.embedding = EmbeddingConfig::for_provider(provider);
        }
        if let Some(model) = get("EMBEDHUB_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(ndims) = parse_var(&get, "EMBEDHUB_EMBEDDING_DIMS")? {
            config.embedding.ndims = ndims;
        }
        if let Some(url) = get("EMBEDHUB_EMBEDDING_URL") {
            config.embedding.base_url = Some(url.trim_end_matches('/').to_string());
        }
        config.embedding.api_key = get("OPENAI_API_KEY");

        if let Some(backend) = parse_var(&get, "EMBEDHUB_VECTOR_STORE")? {
            config.vector_store.backend = backend;
        }
        config.vector_store.pinecone_api_key = get("PINECONE_API_KEY");
        config.vector_store.pinecone_index_host = get("PINECONE_INDEX_HOST").map(|host| {
            let host = host.trim_end_matches('/');
            if host.starts_with("http://") || host.starts_with("https://") {
                host.to_string()
            } else {
                format!("https://{host}")
            }
        });
        if let Some(path) = get("EMBEDHUB_SQLITE_PATH") {
            config.vector_store.sqlite_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> HubResult<()> {
        Url::parse(&self.server.public_url)?;
        Url::parse(&self.sources.github_api_url)?;
        Url::parse(&self.sources.drive_api_url)?;

        if self.auth.session_ttl_seconds == 0 {
            return Err(HubError::InvalidConfig(
                "auth.session_ttl_seconds must be > 0".to_string(),
            ));
        }

        if self.auth.max_sessions == 0 {
            return Err(HubError::InvalidConfig(
                "auth.max_sessions must be > 0".to_string(),
            ));
        }

        if self.sources.fetch_concurrency == 0 {
            return Err(HubError::InvalidConfig(
                "sources.fetch_concurrency must be > 0".to_string(),
            ));
        }

        if self.sources.branch_cache_capacity == 0 {
            return Err(HubError::InvalidConfig(
                "sources.branch_cache_capacity must be > 0".to_string(),
            ));
        }

        self.chunking.validate()?;

        if self.embedding.ndims == 0 {
            return Err(HubError::InvalidConfig(
                "embedding.ndims must be > 0".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(HubError::InvalidConfig(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.embedding.base_url {
            Url::parse(base_url)?;
        }

        if self.embedding.provider == EmbeddingProvider::OpenAi && self.embedding.api_key.is_none() {
            return Err(HubError::InvalidConfig(
                "OPENAI_API_KEY is required for the openai embedding provider".to_string(),
            ));
        }

        if !(1..=1000).contains(&self.vector_store.upsert_batch_size) {
            return Err(HubError::InvalidConfig(
                "vector_store.upsert_batch_size must be in 1..=1000".to_string(),
            ));
        }

        let table = &self.vector_store.table;
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(HubError::InvalidConfig(format!(
                "vector_store.table must be [A-Za-z0-9_]+, got {table:?}"
            )));
        }

        if self.vector_store.backend == VectorBackend::Pinecone {
            if self.vector_store.pinecone_api_key.is_none() {
                return Err(HubError::InvalidConfig(
                    "PINECONE_API_KEY is required for the pinecone vector store".to_string(),
                ));
            }
            match &self.vector_store.pinecone_index_host {
                Some(host) => {
                    Url::parse(host)?;
                }
                None => {
                    return Err(HubError::InvalidConfig(
                        "PINECONE_INDEX_HOST is required for the pinecone vector store"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> HubResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| HubError::InvalidConfig(format!("{key}={raw:?}: {err}")))
        })
        .transpose()
}

fn oauth_client(
    get: &impl Fn(&str) -> Option<String>,
    id_key: &str,
    secret_key: &str,
) -> Option<OAuthClientConfig> {
    match (get(id_key), get(secret_key)) {
        (Some(client_id), Some(client_secret)) => Some(OAuthClientConfig {
            client_id,
            client_secret,
        }),
        _ => None,
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Externally visible base URL, used to build OAuth redirect URIs.
    pub public_url: String,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// OAuth application credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Authorization and token endpoints of the OAuth providers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthEndpoints {
    /// GitHub authorize page.
    pub github_authorize_url: String,
    /// GitHub code exchange endpoint.
    pub github_token_url: String,
    /// Google authorize page.
    pub google_authorize_url: String,
    /// Google code exchange endpoint.
    pub google_token_url: String,
    /// Google `OpenID` userinfo endpoint.
    pub google_userinfo_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            github_authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            github_token_url: "https://github.com/login/oauth/access_token".to_string(),
            google_authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }
}

/// OAuth and session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// GitHub OAuth app, if configured.
    pub github: Option<OAuthClientConfig>,
    /// Google OAuth client, if configured.
    pub google: Option<OAuthClientConfig>,
    /// Provider endpoints.
    pub endpoints: OAuthEndpoints,
    /// Maximum session lifetime in seconds.
    pub session_ttl_seconds: u64,
    /// Lifetime of a pending login `state` in seconds.
    pub login_ttl_seconds: u64,
    /// Maximum number of live sessions kept in memory.
    pub max_sessions: usize,
    /// Interval between expired-session sweeps in seconds.
    pub sweep_interval_seconds: u64,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            github: None,
            google: None,
            endpoints: OAuthEndpoints::default(),
            session_ttl_seconds: 30 * 24 * 60 * 60, // 30 days
            login_ttl_seconds: 600,
            max_sessions: 10_000,
            sweep_interval_seconds: 300,
            secure_cookies: false,
        }
    }
}

/// GitHub and Google Drive client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// GitHub REST API base URL.
    pub github_api_url: String,
    /// Google Drive v3 API base URL.
    pub drive_api_url: String,
    /// `User-Agent` sent to both APIs (GitHub rejects requests without one).
    pub user_agent: String,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Maximum retries for transient failures.
    pub max_retries: u32,
    /// Base delay between retries in milliseconds.
    pub retry_delay_ms: u64,
    /// Maximum number of file downloads in flight per repository.
    pub fetch_concurrency: usize,
    /// Files larger than this are skipped when scraping a repository.
    pub max_file_bytes: u64,
    /// Extensions that are never scraped.
    pub disabled_extensions: Vec<String>,
    /// Page size for Drive file listings.
    pub drive_page_size: u32,
    /// Capacity of the default-branch LRU cache.
    pub branch_cache_capacity: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            drive_api_url: "https://www.googleapis.com/drive/v3".to_string(),
            user_agent: format!("EmbedHub/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay_ms: 500,
            fetch_concurrency: 8,
            max_file_bytes: 1024 * 1024, // 1 MiB
            disabled_extensions: default_disabled_extensions(),
            drive_page_size: 100,
            branch_cache_capacity: 128,
        }
    }
}

fn default_disabled_extensions() -> Vec<String> {
    [
        "exe", "dll", "png", "jpg", "jpeg", "gif", "ico", "bmp", "webp", "pdf", "zip", "gz",
        "tar", "jar", "so", "dylib", "a", "o", "class", "woff", "woff2", "ttf", "otf", "mp3",
        "mp4", "mov", "wasm",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Text chunking settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in bytes.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in bytes.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Validate chunking invariants.
    ///
    /// # Errors
    /// Returns an error if the chunk size is zero or the overlap is not smaller than it.
    pub fn validate(&self) -> HubResult<()> {
        if self.chunk_size == 0 {
            return Err(HubError::InvalidConfig(
                "chunking.chunk_size must be > 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(HubError::InvalidConfig(
                "chunking.overlap must be < chunking.chunk_size".to_string(),
            ));
        }
        Ok(())
    }
}

/// Embedding backend selector.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    #[default]
    OpenAi,
    /// Local Ollama server.
    Ollama,
}

impl FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown embedding provider {other:?}")),
        }
    }
}

/// Embedding model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Which backend computes embeddings.
    pub provider: EmbeddingProvider,
    /// Model name.
    pub model: String,
    /// Embedding vector dimensions.
    pub ndims: usize,
    /// API key (OpenAI).
    pub api_key: Option<String>,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// Maximum texts per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::for_provider(EmbeddingProvider::OpenAi)
    }
}

impl EmbeddingConfig {
    /// Defaults for the given backend.
    #[must_use]
    pub fn for_provider(provider: EmbeddingProvider) -> Self {
        let (model, ndims) = match provider {
            EmbeddingProvider::OpenAi => ("text-embedding-ada-002", 1536),
            EmbeddingProvider::Ollama => ("nomic-embed-text", 768),
        };
        Self {
            provider,
            model: model.to_string(),
            ndims,
            api_key: None,
            base_url: None,
            batch_size: 64,
        }
    }
}

/// Vector store backend selector.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// Pinecone serverless index over REST.
    #[default]
    Pinecone,
    /// Local `SQLite` database with sqlite-vec.
    Sqlite,
}

impl FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown vector store {other:?}")),
        }
    }
}

/// Vector store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Which backend stores vectors.
    pub backend: VectorBackend,
    /// Pinecone API key.
    pub pinecone_api_key: Option<String>,
    /// Pinecone index host (data plane URL).
    pub pinecone_index_host: Option<String>,
    /// Pinecone API version header value.
    pub pinecone_api_version: String,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// `SQLite` table name.
    pub table: String,
    /// Maximum records per upsert request.
    pub upsert_batch_size: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            pinecone_api_key: None,
            pinecone_index_host: None,
            pinecone_api_version: "2024-07".to_string(),
            sqlite_path: PathBuf::from("embedhub.sqlite"),
            table: "embeddings".to_string(),
            upsert_batch_size: 100,
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
