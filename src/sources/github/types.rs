//! GitHub API payloads and scrape results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository as listed by `GET /user/repos`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Repository {
    /// Numeric repository id.
    pub id: u64,
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Browser URL, the input of the scraper.
    pub html_url: String,
    /// Primary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
    /// Creation date.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update date.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A branch as listed by `GET /repos/{owner}/{repo}/branches`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Whether the branch is protected.
    #[serde(default)]
    pub protected: bool,
}

/// Kind of a git tree entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    /// File.
    Blob,
    /// Directory.
    Tree,
    /// Submodule.
    Commit,
}

/// One entry of a recursive git tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Path relative to the tree root.
    pub path: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    /// Object SHA.
    pub sha: String,
    /// Size in bytes (blobs only).
    #[serde(default)]
    pub size: Option<u64>,
}

/// Response of `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tree {
    /// Tree SHA.
    pub sha: String,
    /// Entries.
    pub tree: Vec<TreeEntry>,
    /// GitHub truncates very large trees.
    #[serde(default)]
    pub truncated: bool,
}

/// Authenticated GitHub user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubUser {
    /// Numeric user id.
    pub id: u64,
    /// Login name.
    pub login: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public email.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A repository chosen for scraping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoSelection {
    /// Browser URL (`https://github.com/{owner}/{repo}[/tree/{ref}[/{path}]]`).
    pub html_url: String,
    /// Optional display name; defaults to the repository name from the URL.
    #[serde(default)]
    pub name: Option<String>,
}

/// One scraped file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedFile {
    /// Repository name.
    pub repo: String,
    /// Path inside the repository.
    pub path: String,
    /// File contents.
    pub text: String,
}

impl ScrapedFile {
    /// Extension of the file name (lowercase), empty when there is none.
    #[must_use]
    pub fn extension(&self) -> String {
        file_extension(&self.path)
    }
}

/// A file that was left out, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Repository name.
    pub repo: String,
    /// Path inside the repository.
    pub path: String,
    /// Reason for skipping.
    pub reason: String,
}

/// All files scraped from one repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapedRepository {
    /// Owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Ref the files were read from.
    pub branch: String,
    /// Scraped files, in tree order.
    pub files: Vec<ScrapedFile>,
    /// Files left out.
    pub skipped: Vec<SkippedFile>,
    /// Whether GitHub truncated the tree listing.
    pub truncated: bool,
}

/// Lowercase extension of the last path segment, empty when there is none.
///
/// Dotfiles such as `.gitignore` have no extension.
#[must_use]
pub fn file_extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("src/main.rs"), "rs");
        assert_eq!(file_extension("README.MD"), "md");
        assert_eq!(file_extension("Makefile"), "");
        assert_eq!(file_extension(".gitignore"), "");
        assert_eq!(file_extension("a.b/c"), "");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
    }

    #[test]
    fn test_tree_deserialize() {
        let json = r#"{
            "sha": "abc",
            "truncated": false,
            "tree": [
                {"path": "src", "type": "tree", "sha": "1"},
                {"path": "src/lib.rs", "type": "blob", "sha": "2", "size": 42},
                {"path": "vendor/dep", "type": "commit", "sha": "3"}
            ]
        }"#;
        let tree: Result<Tree, _> = serde_json::from_str(json);
        assert!(tree.is_ok());
        let tree = tree.unwrap_or_else(|_| Tree {
            sha: String::new(),
            tree: Vec::new(),
            truncated: true,
        });
        assert_eq!(tree.tree.len(), 3);
        assert_eq!(tree.tree[1].kind, TreeEntryKind::Blob);
        assert_eq!(tree.tree[1].size, Some(42));
    }
}
