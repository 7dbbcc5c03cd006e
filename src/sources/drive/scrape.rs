//! Read a selection of Drive files as text or as a ZIP archive.

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{info, warn};

use crate::sources::archive::ArchiveBuilder;
use crate::sources::drive::client::{DriveClient, FileContent};
use crate::sources::drive::types::{DriveDocument, DriveScrape, FailedFile};
use crate::sources::error::SourceError;

/// Scrape files as text. Files that cannot be read are reported in
/// [`DriveScrape::failed`]; a rejected token or a rate limit aborts.
///
/// # Errors
/// Returns the first fatal error (see [`SourceError::is_fatal`]).
pub async fn scrape_files(
    client: &DriveClient,
    token: &str,
    file_ids: &[String],
    concurrency: usize,
) -> Result<DriveScrape, SourceError> {
    let results: Vec<Result<DriveDocument, FailedFile>> = stream::iter(file_ids.to_vec())
        .map(|file_id: String| async move {
            match client.fetch_content(token, &file_id).await {
                Ok(content) => Ok(Ok(DriveDocument {
                    content: content.text(),
                    file_id,
                    name: content.file.name,
                    mime_type: content.file.mime_type,
                })),
                Err(err) if err.is_fatal() => Err(err),
                Err(err) => {
                    warn!(file_id = %file_id, error = %err, "Error scraping Drive file");
                    Ok(Err(FailedFile {
                        file_id,
                        reason: err.to_string(),
                    }))
                }
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut scrape = DriveScrape::default();
    for result in results {
        match result {
            Ok(document) => scrape.files.push(document),
            Err(failed) => scrape.failed.push(failed),
        }
    }
    info!(
        files = scrape.files.len(),
        failed = scrape.failed.len(),
        "Scraped Drive files"
    );
    Ok(scrape)
}

/// Download files into a ZIP archive. Any failure fails the whole download.
///
/// # Errors
/// Returns the first error encountered.
pub async fn download_archive(
    client: &DriveClient,
    token: &str,
    file_ids: &[String],
    concurrency: usize,
) -> Result<Vec<u8>, SourceError> {
    let contents: Vec<FileContent> = stream::iter(file_ids.to_vec())
        .map(|file_id: String| async move { client.fetch_content(token, &file_id).await })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut builder = ArchiveBuilder::new();
    for content in &contents {
        builder.add_file(&content.archive_name, &content.bytes)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::sources::drive::client::tests::fake_drive;
    use crate::sources::github::client::tests::{serve, test_config};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_scrape_reports_failures() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();

        let scrape = scrape_files(&client, "good", &ids(&["doc1", "missing", "form1", "note1"]), 4)
            .await
            .unwrap();

        let names: Vec<_> = scrape.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Plan", "notes.md"]);
        assert_eq!(scrape.files[0].content, "The plan");
        let failed: Vec<_> = scrape.failed.iter().map(|f| f.file_id.as_str()).collect();
        assert_eq!(failed, vec!["missing", "form1"]);
    }

    #[tokio::test]
    async fn test_scrape_bad_token_aborts() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();
        let result = scrape_files(&client, "bad", &ids(&["doc1"]), 1).await;
        assert!(matches!(result, Err(SourceError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_download_archive_names() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();

        let bytes = download_archive(&client, "good", &ids(&["doc1", "note1", "plain1"]), 2)
            .await
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<_> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["Plan.txt", "notes.md", "notes (1).md"]);
    }

    #[tokio::test]
    async fn test_download_fails_on_any_error() {
        let base = serve(fake_drive()).await;
        let client = DriveClient::new(&test_config(&base)).unwrap();
        let result = download_archive(&client, "good", &ids(&["doc1", "missing"]), 2).await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }
}
