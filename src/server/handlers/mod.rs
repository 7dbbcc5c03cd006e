//! Route handlers.

pub mod auth;
pub mod drive;
pub mod embeddings;
pub mod github;

use axum::Json;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::errors::HubResult;
use crate::core::provider::Provider;
use crate::ingest::{IngestReport, IngestRequest, Namespace};
use crate::server::state::AppState;

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "embedhub",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// An input the embed routes left out.
#[derive(Debug, Serialize, Deserialize)]
pub struct SkippedInput {
    /// File path or file id.
    pub id: String,
    /// Why it was left out.
    pub reason: String,
}

/// Response of the provider embed routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Summary.
    pub message: String,
    /// One report per embedded file.
    pub results: Vec<IngestReport>,
    /// Inputs that were blank or failed to embed.
    pub skipped: Vec<SkippedInput>,
}

/// A file queued by a provider embed route.
pub(crate) struct PendingEmbed {
    pub id: String,
    pub text: String,
    pub namespace: HubResult<Namespace>,
    pub resource_id: String,
}

/// Ingest files one by one. Blank files and files that fail are reported in
/// `skipped`; files already stored stay listed in the reports.
pub(crate) async fn embed_each(
    state: &AppState,
    provider: Provider,
    files: Vec<PendingEmbed>,
) -> (Vec<IngestReport>, Vec<SkippedInput>) {
    let mut results = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for file in files {
        if file.text.trim().is_empty() {
            skipped.push(SkippedInput {
                id: file.id,
                reason: "text is empty".to_string(),
            });
            continue;
        }
        let outcome = match file.namespace {
            Ok(namespace) => {
                state
                    .pipeline
                    .ingest(IngestRequest {
                        text: file.text,
                        provider: provider.as_str().to_string(),
                        namespace,
                        resource_id: file.resource_id,
                    })
                    .await
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(report) => results.push(report),
            Err(err) => {
                warn!(id = %file.id, error = %err, "Failed to embed file");
                skipped.push(SkippedInput {
                    id: file.id,
                    reason: err.to_string(),
                });
            }
        }
    }
    (results, skipped)
}

/// `application/zip` attachment.
pub fn zip_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (CONTENT_TYPE, "application/zip".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
