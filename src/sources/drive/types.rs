//! Google Drive API payloads and scrape results.

use serde::{Deserialize, Serialize};

/// File metadata as returned by `files.get` / `files.list`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File id.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// MIME type; Google-native types start with `application/vnd.google-apps.`.
    #[serde(default)]
    pub mime_type: String,
}

/// One page of `files.list`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Files on this page.
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Token of the next page, absent on the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Text content of one Drive file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveDocument {
    /// File id.
    pub file_id: String,
    /// File name.
    pub name: String,
    /// Original MIME type.
    pub mime_type: String,
    /// Text content (exported or decoded as lossy UTF-8).
    pub content: String,
}

/// A file that could not be read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    /// File id.
    pub file_id: String,
    /// What went wrong.
    pub reason: String,
}

/// Result of scraping a selection of Drive files.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DriveScrape {
    /// Files read successfully, in request order.
    pub files: Vec<DriveDocument>,
    /// Files that failed.
    pub failed: Vec<FailedFile>,
}
