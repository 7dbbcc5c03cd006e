//! Google Drive v3 REST client.

use reqwest::header::CONTENT_DISPOSITION;
use tracing::debug;

use crate::core::config::SourcesConfig;
use crate::sources::archive::content_disposition_filename;
use crate::sources::drive::export::{ContentPlan, plan_for};
use crate::sources::drive::types::{DriveFile, FileList};
use crate::sources::error::SourceError;
use crate::sources::http::{RetryPolicy, build_client, send_checked};

const SERVICE: &str = "Google Drive";

/// Raw content of one file plus the name it should carry in an archive.
#[derive(Clone, Debug)]
pub struct FileContent {
    /// File metadata.
    pub file: DriveFile,
    /// Exported or downloaded bytes.
    pub bytes: Vec<u8>,
    /// Name for archive entries.
    pub archive_name: String,
}

impl FileContent {
    /// Content decoded as UTF-8, invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Thin client over `files.list`, `files.get` and `files.export`.
pub struct DriveClient {
    http: reqwest::Client,
    api_url: String,
    retry: RetryPolicy,
    page_size: u32,
}

impl DriveClient {
    /// Create a client from the sources configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: build_client(config)?,
            api_url: config.drive_api_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(config),
            page_size: config.drive_page_size.clamp(1, 1000),
        })
    }

    async fn get(&self, token: &str, url: &str) -> Result<reqwest::Response, SourceError> {
        send_checked(SERVICE, self.retry, || self.http.get(url).bearer_auth(token)).await
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(file_id))
    }

    /// One page of the user's files.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list_files(
        &self,
        token: &str,
        page_token: Option<&str>,
    ) -> Result<FileList, SourceError> {
        let mut url = format!(
            "{}/files?pageSize={}&fields={}",
            self.api_url,
            self.page_size,
            urlencoding::encode("nextPageToken,files(id,name,mimeType)")
        );
        if let Some(page_token) = page_token.filter(|t| !t.is_empty()) {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(page_token));
        }
        Ok(self.get(token, &url).await?.json().await?)
    }

    /// Metadata of one file.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn metadata(&self, token: &str, file_id: &str) -> Result<DriveFile, SourceError> {
        let url = format!("{}?fields=id,name,mimeType", self.file_url(file_id));
        Ok(self.get(token, &url).await?.json().await?)
    }

    /// Read a file: Google-native files are exported, others downloaded.
    ///
    /// # Errors
    /// Returns [`SourceError::UnsupportedMimeType`] for native types without
    /// a text export, or the request error.
    pub async fn fetch_content(
        &self,
        token: &str,
        file_id: &str,
    ) -> Result<FileContent, SourceError> {
        let file = self.metadata(token, file_id).await?;
        let fallback_name = if file.name.trim().is_empty() {
            format!("file_{file_id}")
        } else {
            file.name.clone()
        };

        match plan_for(&file.mime_type) {
            ContentPlan::Unsupported => Err(SourceError::UnsupportedMimeType(file.mime_type)),
            ContentPlan::Export {
                mime_type,
                extension,
            } => {
                let url = format!(
                    "{}/export?mimeType={}",
                    self.file_url(file_id),
                    urlencoding::encode(mime_type)
                );
                let bytes = self.get(token, &url).await?.bytes().await?.to_vec();
                debug!(file_id, mime_type, bytes = bytes.len(), "Exported Drive file");
                let suffix = format!(".{extension}");
                let archive_name = if fallback_name.to_ascii_lowercase().ends_with(&suffix) {
                    fallback_name
                } else {
                    format!("{fallback_name}{suffix}")
                };
                Ok(FileContent {
                    file,
                    bytes,
                    archive_name,
                })
            }
            ContentPlan::Download => {
                let url = format!("{}?alt=media", self.file_url(file_id));
                let response = self.get(token, &url).await?;
                let disposition_name = response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(content_disposition_filename);
                let bytes = response.bytes().await?.to_vec();
                debug!(file_id, bytes = bytes.len(), "Downloaded Drive file");
                Ok(FileContent {
                    file,
                    bytes,
                    archive_name: disposition_name.unwrap_or(fallback_name),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use serde_json::json;
    use std::collections::HashMap;

    use super::*;
    use crate::sources::github::client::tests::{serve, test_config};

    /// Fake Drive API: `doc1` (Google Doc), `sheet1` (Sheet), `note1`
    /// (text file with Content-Disposition), `form1` (unsupported native type).
    pub(crate) fn fake_drive() -> Router {
        fn authorized(headers: &HeaderMap) -> bool {
            headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer good")
        }

        async fn file(
            Path(id): Path<String>,
            Query(q): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            if !authorized(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            if q.get("alt").map(String::as_str) == Some("media") {
                return match id.as_str() {
                    "note1" => (
                        [(header::CONTENT_DISPOSITION, "attachment; filename=\"notes.md\"")],
                        "hello from drive",
                    )
                        .into_response(),
                    "plain1" => "plain text".into_response(),
                    _ => StatusCode::NOT_FOUND.into_response(),
                };
            }
            let (name, mime) = match id.as_str() {
                "doc1" => ("Plan", "application/vnd.google-apps.document"),
                "sheet1" => ("Budget", "application/vnd.google-apps.spreadsheet"),
                "note1" => ("notes.md", "text/markdown"),
                "plain1" => ("notes.md", "text/plain"),
                "form1" => ("Survey", "application/vnd.google-apps.form"),
                _ => return StatusCode::NOT_FOUND.into_response(),
            };
            axum::Json(json!({"id": id, "name": name, "mimeType": mime})).into_response()
        }

        async fn export(
            Path(id): Path<String>,
            Query(q): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            if !authorized(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            match (id.as_str(), q.get("mimeType").map(String::as_str)) {
                ("doc1", Some("text/plain")) => "The plan".into_response(),
                ("sheet1", Some("text/csv")) => "a,b\n1,2".into_response(),
                _ => StatusCode::BAD_REQUEST.into_response(),
            }
        }

        async fn list(Query(q): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
            if !authorized(&headers) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            let body = match q.get("pageToken").map(String::as_str) {
                None => json!({
                    "nextPageToken": "p2",
                    "files": [{"id": "doc1", "name": "Plan", "mimeType": "application/vnd.google-apps.document"}]
                }),
                Some(_) => json!({
                    "files": [{"id": "note1", "name": "notes.md", "mimeType": "text/markdown"}]
                }),
            };
            axum::Json(body).into_response()
        }

        Router::new()
            .route("/files", get(list))
            .route("/files/{id}", get(file))
            .route("/files/{id}/export", get(export))
    }

    #[tokio::test]
    async fn test_list_files_pages() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();

        let first = client.list_files("good", None).await.unwrap();
        assert_eq!(first.files[0].id, "doc1");
        assert_eq!(first.next_page_token.as_deref(), Some("p2"));

        let second = client.list_files("good", Some("p2")).await.unwrap();
        assert_eq!(second.files[0].id, "note1");
        assert!(second.next_page_token.is_none());

        let denied = client.list_files("bad", None).await;
        assert!(matches!(denied, Err(SourceError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_fetch_content_export_and_download() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();

        let doc = client.fetch_content("good", "doc1").await.unwrap();
        assert_eq!(doc.text(), "The plan");
        assert_eq!(doc.archive_name, "Plan.txt");

        let sheet = client.fetch_content("good", "sheet1").await.unwrap();
        assert_eq!(sheet.text(), "a,b\n1,2");
        assert_eq!(sheet.archive_name, "Budget.csv");

        let note = client.fetch_content("good", "note1").await.unwrap();
        assert_eq!(note.text(), "hello from drive");
        assert_eq!(note.archive_name, "notes.md");

        let form = client.fetch_content("good", "form1").await;
        assert!(matches!(form, Err(SourceError::UnsupportedMimeType(_))));
    }
}
