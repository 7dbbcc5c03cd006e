//! GitHub routes: repositories, branches, scraping, archives and embedding.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::core::provider::Provider;
use crate::ingest::{Namespace, github_resource_id};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::{access_token, require_provider_session};
use crate::server::handlers::{EmbedResponse, PendingEmbed, embed_each, zip_response};
use crate::server::state::AppState;
use crate::sources::archive::{GITHUB_ARCHIVE_NAME, github_archive};
use crate::sources::github::{
    RepoSelection, Repository, RepositoryScraper, ScrapeOptions, ScrapeOutcome, ScrapedFile,
    SkippedFile,
};

/// Paging of `GET /api/github/repos`.
#[derive(Debug, Deserialize)]
pub struct RepoPage {
    /// 1-based page, default 1.
    pub page: Option<u32>,
    /// Page size, default 10.
    pub per_page: Option<u32>,
}

/// The user's own repositories.
pub async fn list_repos(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(paging): Query<RepoPage>,
) -> ApiResult<Json<Vec<Repository>>> {
    let token = access_token(&state, &headers, Provider::Github)?;
    let repos = state
        .github
        .list_repositories(&token, paging.page.unwrap_or(1), paging.per_page.unwrap_or(10))
        .await?;
    Ok(Json(repos))
}

/// Branch names of a repository.
pub async fn list_branches(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Json<Vec<String>>> {
    let token = access_token(&state, &headers, Provider::Github)?;
    let branches = state.github.list_branches(&token, &owner, &repo).await?;
    Ok(Json(branches.into_iter().map(|b| b.name).collect()))
}

/// Body of the scrape and archive routes.
#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    /// Repositories to read.
    #[serde(default)]
    pub selected_repos: Vec<RepoSelection>,
    /// Ref override for every repository.
    #[serde(default)]
    pub branch: Option<String>,
    /// Only keep these extensions.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    /// Also return the ZIP archive, base64-encoded.
    #[serde(default)]
    pub include_archive: bool,
}

/// Response of `POST /api/github/scrape`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeResponse {
    /// Scraped files.
    pub files_data: Vec<ScrapedFile>,
    /// All files as one text.
    pub formatted_text: String,
    /// Distinct extensions of the scraped files.
    pub extensions: Vec<String>,
    /// Files left out.
    pub skipped: Vec<SkippedFile>,
    /// ZIP archive, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_base64: Option<String>,
}

async fn run_scrape(
    state: &AppState,
    headers: &HeaderMap,
    request: &ScrapeRequest,
) -> ApiResult<ScrapeOutcome> {
    let token = access_token(state, headers, Provider::Github)?;
    if request.selected_repos.is_empty() {
        return Err(ApiError::bad_request("No repositories selected."));
    }
    let options = ScrapeOptions {
        branch: request.branch.clone(),
        extensions: request.extensions.clone(),
    };
    let scraper = RepositoryScraper::new(&state.github, &state.config.sources);
    Ok(scraper
        .scrape_all(&token, &request.selected_repos, &options)
        .await?)
}

/// Scrape the selected repositories.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Json<ScrapeResponse>> {
    let outcome = run_scrape(&state, &headers, &request).await?;
    let archive_base64 = if request.include_archive {
        Some(STANDARD.encode(github_archive(&outcome)?))
    } else {
        None
    };
    Ok(Json(ScrapeResponse {
        files_data: outcome.files().cloned().collect(),
        formatted_text: outcome.formatted_text(),
        extensions: outcome.extensions(),
        skipped: outcome.skipped().cloned().collect(),
        archive_base64,
    }))
}

/// Scrape the selected repositories into `repository_contents.zip`.
pub async fn archive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Response> {
    let outcome = run_scrape(&state, &headers, &request).await?;
    Ok(zip_response(GITHUB_ARCHIVE_NAME, github_archive(&outcome)?))
}

/// One file to embed.
#[derive(Debug, Deserialize)]
pub struct EmbedFile {
    /// Path inside the repository.
    pub path: String,
    /// File contents.
    pub text: String,
}

/// Body of `POST /api/github/embed`.
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Ref the files were read from.
    pub branch: String,
    /// Files to embed.
    #[serde(default)]
    pub files: Vec<EmbedFile>,
}

/// Embed repository files, one namespace per file.
pub async fn embed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<EmbedRequest>,
) -> ApiResult<Json<EmbedResponse>> {
    require_provider_session(&state, &headers, Provider::Github)?;
    if request.files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }
    let resource_id = github_resource_id(&request.owner, &request.repo);

    let pending = request
        .files
        .into_iter()
        .map(|file| PendingEmbed {
            namespace: Namespace::for_github_file(
                &request.owner,
                &request.repo,
                &request.branch,
                &file.path,
            ),
            id: file.path,
            text: file.text,
            resource_id: resource_id.clone(),
        })
        .collect();
    let (results, skipped) = embed_each(&state, Provider::Github, pending).await;

    Ok(Json(EmbedResponse {
        message: format!("Embedded {} file(s) from {}", results.len(), resource_id),
        results,
        skipped,
    }))
}
