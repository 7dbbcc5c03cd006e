//! ZIP archives of scraped content.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::sources::error::SourceError;
use crate::sources::github::ScrapeOutcome;

/// File name of the GitHub archive download.
pub const GITHUB_ARCHIVE_NAME: &str = "repository_contents.zip";
/// File name of the Drive archive download.
pub const DRIVE_ARCHIVE_NAME: &str = "google_drive_files.zip";

/// In-memory ZIP writer that keeps entry names unique.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashMap<String, usize>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Start an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashMap::new(),
        }
    }

    /// Add a file. The name is reduced to relative segments (no leading
    /// slash, no `.` or `..`, backslashes read as separators); a name
    /// already in the archive gets a ` (n)` suffix before its extension.
    ///
    /// Returns the name actually used.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written.
    pub fn add_file(&mut self, name: &str, contents: &[u8]) -> Result<String, SourceError> {
        let name = self.unique_name(&entry_name(name));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name.as_str(), options)?;
        self.writer.write_all(contents)?;
        Ok(name)
    }

    /// Finish the archive and return its bytes.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be written.
    pub fn finish(self) -> Result<Vec<u8>, SourceError> {
        Ok(self.writer.finish()?.into_inner())
    }

    fn unique_name(&mut self, name: &str) -> String {
        let name = if name.is_empty() { "file" } else { name };
        let count = self.names.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return name.to_string();
        }

        let n = *count - 1;
        let (dir, file) = name.rsplit_once('/').map_or(("", name), |(d, f)| (d, f));
        let renamed = match file.rfind('.') {
            Some(idx) if idx > 0 => format!("{} ({n}){}", &file[..idx], &file[idx..]),
            _ => format!("{file} ({n})"),
        };
        let candidate = if dir.is_empty() {
            renamed
        } else {
            format!("{dir}/{renamed}")
        };
        // The suffixed name may itself collide with a real file.
        self.unique_name(&candidate)
    }
}

/// Relative entry name: empty, `.` and `..` segments are dropped.
fn entry_name(name: &str) -> String {
    name.split(['/', '\\'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Archive with one folder per repository.
///
/// # Errors
/// Returns an error if the archive cannot be written.
pub fn github_archive(outcome: &ScrapeOutcome) -> Result<Vec<u8>, SourceError> {
    let mut builder = ArchiveBuilder::new();
    for file in outcome.files() {
        let path = file.path.trim_start_matches('/');
        builder.add_file(&format!("{}/{path}", file.repo), file.text.as_bytes())?;
    }
    builder.finish()
}

/// File name from a `Content-Disposition` header value.
///
/// Handles `filename="a b.txt"`, `filename=a.txt` and the RFC 5987
/// `filename*=UTF-8''a%20b.txt` form, which wins when both are present.
#[must_use]
pub fn content_disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().rsplit("''").next().unwrap_or(raw);
                if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"')) {
                    let name = decoded.trim().to_string();
                    if !name.is_empty() {
                        return Some(name);
                    }
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"').trim().to_string();
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::sources::github::{ScrapedFile, ScrapedRepository};

    fn entries(bytes: Vec<u8>) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut text = String::new();
                file.read_to_string(&mut text).unwrap();
                (file.name().to_string(), text)
            })
            .collect()
    }

    #[test]
    fn test_duplicate_names_get_suffix() {
        let mut builder = ArchiveBuilder::new();
        assert_eq!(builder.add_file("notes.txt", b"1").unwrap(), "notes.txt");
        assert_eq!(builder.add_file("notes.txt", b"2").unwrap(), "notes (1).txt");
        assert_eq!(builder.add_file("notes.txt", b"3").unwrap(), "notes (2).txt");
        assert_eq!(builder.add_file("/dir/README", b"4").unwrap(), "dir/README");
        assert_eq!(builder.add_file("dir/README", b"5").unwrap(), "dir/README (1)");

        let names: Vec<_> = entries(builder.finish().unwrap())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_entry_names_stay_inside_archive() {
        let mut builder = ArchiveBuilder::new();
        assert_eq!(builder.add_file("../../etc/passwd", b"1").unwrap(), "etc/passwd");
        assert_eq!(builder.add_file("/abs/./x.txt", b"2").unwrap(), "abs/x.txt");
        assert_eq!(builder.add_file("..\\win\\boot.ini", b"3").unwrap(), "win/boot.ini");
        assert_eq!(builder.add_file("..", b"4").unwrap(), "file");

        let names: Vec<_> = entries(builder.finish().unwrap())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.iter().all(|n| !n.contains("..") && !n.starts_with('/')));
    }

    #[test]
    fn test_suffixed_name_collision() {
        let mut builder = ArchiveBuilder::new();
        builder.add_file("a (1).txt", b"x").unwrap();
        builder.add_file("a.txt", b"y").unwrap();
        assert_eq!(builder.add_file("a.txt", b"z").unwrap(), "a (1) (1).txt");
    }

    #[test]
    fn test_github_archive_layout() {
        let outcome = ScrapeOutcome {
            repositories: vec![ScrapedRepository {
                owner: "octo".to_string(),
                repo: "hello".to_string(),
                branch: "main".to_string(),
                files: vec![ScrapedFile {
                    repo: "hello".to_string(),
                    path: "/src/lib.rs".to_string(),
                    text: "pub fn hi() {}".to_string(),
                }],
                skipped: Vec::new(),
                truncated: false,
            }],
        };
        let files = entries(github_archive(&outcome).unwrap());
        assert_eq!(
            files,
            vec![("hello/src/lib.rs".to_string(), "pub fn hi() {}".to_string())]
        );
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition_filename(r#"attachment; filename="report 1.pdf""#).as_deref(),
            Some("report 1.pdf")
        );
        assert_eq!(
            content_disposition_filename("attachment; filename=data.csv").as_deref(),
            Some("data.csv")
        );
        assert_eq!(
            content_disposition_filename(
                r#"attachment; filename="fallback.txt"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt"#
            )
            .as_deref(),
            Some("résumé.txt")
        );
        assert_eq!(content_disposition_filename("inline"), None);
        assert_eq!(content_disposition_filename("attachment; filename=\"\""), None);
    }
}
