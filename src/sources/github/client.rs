//! GitHub REST API client.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::config::SourcesConfig;
use crate::sources::error::SourceError;
use crate::sources::github::types::{Branch, GithubUser, Repository, Tree};
use crate::sources::http::{RetryPolicy, build_client, send_checked};

const SERVICE: &str = "GitHub";
const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_OBJECT: &str = "application/vnd.github.object+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

/// Thin client over the endpoints the scraper and dashboard need.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    retry: RetryPolicy,
    default_branches: Mutex<LruCache<String, String>>,
}

/// Cache key scoped to the caller's token, so one user's lookup never
/// answers for another user.
fn branch_cache_key(token: &str, owner: &str, repo: &str) -> String {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    format!("{:016x}:{owner}/{repo}", hasher.finish())
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct ContentObject {
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GithubClient {
    /// Create a client from the sources configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let capacity =
            NonZeroUsize::new(config.branch_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            http: build_client(config)?,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(config),
            default_branches: Mutex::new(LruCache::new(capacity)),
        })
    }

    async fn get(
        &self,
        token: &str,
        url: &str,
        accept: &'static str,
    ) -> Result<reqwest::Response, SourceError> {
        send_checked(SERVICE, self.retry, || {
            self.http
                .get(url)
                .bearer_auth(token)
                .header("Accept", accept)
                .header("X-GitHub-Api-Version", API_VERSION)
        })
        .await
    }

    /// The authenticated user.
    ///
    /// # Errors
    /// Returns an error if the request fails or the token is rejected.
    pub async fn authenticated_user(&self, token: &str) -> Result<GithubUser, SourceError> {
        let url = format!("{}/user", self.api_url);
        Ok(self.get(token, &url, ACCEPT_JSON).await?.json().await?)
    }

    /// Repositories owned by the authenticated user, one page at a time.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list_repositories(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Repository>, SourceError> {
        let url = format!(
            "{}/user/repos?per_page={}&page={}&type=owner",
            self.api_url,
            per_page.clamp(1, 100),
            page.max(1)
        );
        Ok(self.get(token, &url, ACCEPT_JSON).await?.json().await?)
    }

    /// Branches of a repository (first 100).
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list_branches(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Branch>, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/branches?per_page=100",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        Ok(self.get(token, &url, ACCEPT_JSON).await?.json().await?)
    }

    /// Default branch of a repository, cached per token and `owner/repo`.
    ///
    /// # Errors
    /// Returns an error if the repository cannot be read.
    pub async fn default_branch(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<String, SourceError> {
        let key = branch_cache_key(token, owner, repo);
        if let Some(branch) = self.default_branches.lock().await.get(&key).cloned() {
            return Ok(branch);
        }

        let url = format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        let info: RepoInfo = self.get(token, &url, ACCEPT_JSON).await?.json().await?;
        debug!(owner, repo, branch = %info.default_branch, "Resolved default branch");

        self.default_branches
            .lock()
            .await
            .put(key, info.default_branch.clone());
        Ok(info.default_branch)
    }

    /// The tree to list: the ref itself for the repository root, the
    /// directory's SHA for a sub-path.
    ///
    /// # Errors
    /// Returns [`SourceError::NotFound`] if the path is not a directory.
    pub async fn resolve_tree_sha(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: Option<&str>,
    ) -> Result<String, SourceError> {
        let Some(path) = path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) else {
            return Ok(git_ref.to_string());
        };

        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encode_path(path),
            urlencoding::encode(git_ref)
        );
        let object: ContentObject = self.get(token, &url, ACCEPT_OBJECT).await?.json().await?;
        if object.kind != "dir" {
            return Err(SourceError::NotFound(format!("{path} is not a directory")));
        }
        Ok(object.sha)
    }

    /// Recursive listing of a tree.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn fetch_tree(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        tree_sha: &str,
    ) -> Result<Tree, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(tree_sha)
        );
        Ok(self.get(token, &url, ACCEPT_JSON).await?.json().await?)
    }

    /// Raw contents of one file at a ref.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn fetch_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<String, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url,
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encode_path(path.trim_start_matches('/')),
            urlencoding::encode(git_ref)
        );
        let bytes = self.get(token, &url, ACCEPT_RAW).await?.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Percent-encode each segment of a repository path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
