//! Google Drive routes: listing, scraping, ZIP download and embedding.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;

use crate::core::provider::Provider;
use crate::ingest::{Namespace, drive_resource_id};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::{access_token, require_provider_session};
use crate::server::handlers::{EmbedResponse, PendingEmbed, embed_each, zip_response};
use crate::server::state::AppState;
use crate::sources::archive::DRIVE_ARCHIVE_NAME;
use crate::sources::drive::{DriveScrape, FileList, download_archive, scrape_files};

/// Paging of `GET /api/drive/files`.
#[derive(Debug, Deserialize)]
pub struct FilePage {
    /// Token from the previous page.
    pub page_token: Option<String>,
}

/// One page of the user's Drive files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(paging): Query<FilePage>,
) -> ApiResult<Json<FileList>> {
    let token = access_token(&state, &headers, Provider::Google)?;
    let files = state
        .drive
        .list_files(&token, paging.page_token.as_deref())
        .await?;
    Ok(Json(files))
}

/// Body of the scrape and download routes.
#[derive(Debug, Deserialize)]
pub struct FileSelection {
    /// Drive file ids.
    #[serde(default, alias = "fileIds")]
    pub file_ids: Vec<String>,
}

fn selected_ids(selection: FileSelection) -> ApiResult<Vec<String>> {
    let ids: Vec<String> = selection
        .file_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(ApiError::bad_request("No file IDs provided"));
    }
    Ok(ids)
}

/// Read the selected files as text.
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(selection): Json<FileSelection>,
) -> ApiResult<Json<DriveScrape>> {
    let token = access_token(&state, &headers, Provider::Google)?;
    let ids = selected_ids(selection)?;
    let scrape = scrape_files(
        &state.drive,
        &token,
        &ids,
        state.config.sources.fetch_concurrency,
    )
    .await?;
    Ok(Json(scrape))
}

/// Download the selected files as `google_drive_files.zip`.
pub async fn download(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(selection): Json<FileSelection>,
) -> ApiResult<Response> {
    let token = access_token(&state, &headers, Provider::Google)?;
    let ids = selected_ids(selection)?;
    let archive = download_archive(
        &state.drive,
        &token,
        &ids,
        state.config.sources.fetch_concurrency,
    )
    .await?;
    Ok(zip_response(DRIVE_ARCHIVE_NAME, archive))
}

/// One scraped file to embed.
#[derive(Debug, Deserialize)]
pub struct EmbedFile {
    /// Drive file id.
    pub file_id: String,
    /// File name, for logs and reports.
    #[serde(default)]
    pub name: Option<String>,
    /// Text content.
    pub content: String,
}

/// Body of `POST /api/drive/embed`.
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    /// Files to embed.
    #[serde(default)]
    pub files: Vec<EmbedFile>,
}

/// Embed Drive files, one namespace per file.
pub async fn embed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<EmbedRequest>,
) -> ApiResult<Json<EmbedResponse>> {
    require_provider_session(&state, &headers, Provider::Google)?;
    if request.files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let pending = request
        .files
        .into_iter()
        .map(|file| {
            debug!(file_id = %file.file_id, name = ?file.name, "Embedding Drive file");
            PendingEmbed {
                namespace: Namespace::for_drive_file(&file.file_id),
                resource_id: drive_resource_id(&file.file_id),
                id: file.file_id,
                text: file.content,
            }
        })
        .collect();
    let (results, skipped) = embed_each(&state, Provider::Google, pending).await;

    Ok(Json(EmbedResponse {
        message: format!("Embedded {} Drive file(s)", results.len()),
        results,
        skipped,
    }))
}
