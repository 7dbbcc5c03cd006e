//! Turn a repository selection into scraped files.

use std::collections::{BTreeSet, HashSet};

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::config::SourcesConfig;
use crate::sources::error::SourceError;
use crate::sources::github::client::GithubClient;
use crate::sources::github::types::{
    RepoSelection, ScrapedFile, ScrapedRepository, SkippedFile, TreeEntry, TreeEntryKind,
    file_extension,
};
use crate::sources::github::url::parse_repo_url;

/// Per-request scrape options.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Ref to read from every repository; falls back to the URL's ref, then the default branch.
    #[serde(default)]
    pub branch: Option<String>,
    /// Only keep files with these extensions.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

/// Result of scraping a set of repositories.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    /// Scraped repositories, in selection order.
    pub repositories: Vec<ScrapedRepository>,
}

impl ScrapeOutcome {
    /// All scraped files.
    pub fn files(&self) -> impl Iterator<Item = &ScrapedFile> {
        self.repositories.iter().flat_map(|r| r.files.iter())
    }

    /// All skipped files.
    pub fn skipped(&self) -> impl Iterator<Item = &SkippedFile> {
        self.repositories.iter().flat_map(|r| r.skipped.iter())
    }

    /// `Repository: {repo}\nFile: {path}\n\n{text}` blocks joined by blank lines.
    #[must_use]
    pub fn formatted_text(&self) -> String {
        self.files()
            .map(|f| format!("Repository: {}\nFile: {}\n\n{}", f.repo, f.path, f.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Distinct extensions of the scraped files, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        self.files()
            .map(ScrapedFile::extension)
            .filter(|ext| !ext.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Keep,
    Ignore,
    Skip(String),
}

/// Which tree entries are worth fetching.
#[derive(Clone, Debug)]
struct FileFilter {
    disabled: HashSet<String>,
    allowed: Option<HashSet<String>>,
    max_bytes: u64,
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl FileFilter {
    fn new(config: &SourcesConfig, allowed: Option<&[String]>) -> Self {
        let allowed = allowed
            .map(|list| {
                list.iter()
                    .map(|ext| normalize_extension(ext))
                    .filter(|ext| !ext.is_empty())
                    .collect::<HashSet<_>>()
            })
            .filter(|set| !set.is_empty());
        Self {
            disabled: config
                .disabled_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            allowed,
            max_bytes: config.max_file_bytes,
        }
    }

    fn decide(&self, entry: &TreeEntry) -> Decision {
        if entry.kind != TreeEntryKind::Blob {
            return Decision::Ignore;
        }
        let ext = file_extension(&entry.path);
        if self.disabled.contains(&ext) {
            return Decision::Ignore;
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&ext) {
                return Decision::Ignore;
            }
        }
        match entry.size {
            Some(size) if size > self.max_bytes => Decision::Skip(format!(
                "file is {size} bytes, limit is {}",
                self.max_bytes
            )),
            _ => Decision::Keep,
        }
    }
}

/// Scrapes repositories through a [`GithubClient`].
pub struct RepositoryScraper<'a> {
    client: &'a GithubClient,
    config: &'a SourcesConfig,
}

impl<'a> RepositoryScraper<'a> {
    /// Create a scraper.
    #[must_use]
    pub const fn new(client: &'a GithubClient, config: &'a SourcesConfig) -> Self {
        Self { client, config }
    }

    /// Scrape every selected repository in order.
    ///
    /// # Errors
    /// Returns the first repository-level failure: bad URL, unknown ref,
    /// rejected token or rate limit. Failures on single files are recorded
    /// as skipped instead.
    pub async fn scrape_all(
        &self,
        token: &str,
        selections: &[RepoSelection],
        options: &ScrapeOptions,
    ) -> Result<ScrapeOutcome, SourceError> {
        let mut outcome = ScrapeOutcome::default();
        for selection in selections {
            outcome
                .repositories
                .push(self.scrape(token, selection, options).await?);
        }
        Ok(outcome)
    }

    /// Scrape one repository.
    ///
    /// # Errors
    /// See [`RepositoryScraper::scrape_all`].
    pub async fn scrape(
        &self,
        token: &str,
        selection: &RepoSelection,
        options: &ScrapeOptions,
    ) -> Result<ScrapedRepository, SourceError> {
        let location = parse_repo_url(&selection.html_url)?;
        let owner = location.owner.as_str();
        let repo = location.repo.as_str();
        let display_name = selection.name.clone().unwrap_or_else(|| location.repo.clone());

        let branch = match options
            .branch
            .clone()
            .filter(|b| !b.trim().is_empty())
            .or_else(|| location.git_ref.clone())
        {
            Some(branch) => branch,
            None => self.client.default_branch(token, owner, repo).await?,
        };

        let prefix = location
            .path
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty());
        let tree_sha = self
            .client
            .resolve_tree_sha(token, owner, repo, &branch, prefix)
            .await?;
        let tree = self.client.fetch_tree(token, owner, repo, &tree_sha).await?;
        if tree.truncated {
            warn!(repo = %location.full_name(), "GitHub truncated the tree listing");
        }

        let filter = FileFilter::new(self.config, options.extensions.as_deref());
        let mut wanted = Vec::new();
        let mut skipped = Vec::new();
        for entry in &tree.tree {
            let path = match prefix {
                Some(prefix) => format!("{prefix}/{}", entry.path),
                None => entry.path.clone(),
            };
            match filter.decide(entry) {
                Decision::Keep => wanted.push(path),
                Decision::Ignore => {}
                Decision::Skip(reason) => skipped.push(SkippedFile {
                    repo: display_name.clone(),
                    path,
                    reason,
                }),
            }
        }
        debug!(
            repo = %location.full_name(),
            branch = %branch,
            files = wanted.len(),
            "Fetching repository files"
        );

        let concurrency = self.config.fetch_concurrency.max(1);
        let fetched: Vec<Result<ScrapedFile, SkippedFile>> = stream::iter(wanted)
            .map(|path| {
                let branch = branch.as_str();
                let display_name = display_name.as_str();
                async move {
                    match self.client.fetch_file(token, owner, repo, branch, &path).await {
                        Ok(text) => Ok(Ok(ScrapedFile {
                            repo: display_name.to_string(),
                            path,
                            text,
                        })),
                        Err(err) if err.is_fatal() => Err(err),
                        Err(err) => {
                            warn!(path = %path, error = %err, "Skipping file");
                            Ok(Err(SkippedFile {
                                repo: display_name.to_string(),
                                path,
                                reason: err.to_string(),
                            }))
                        }
                    }
                }
            })
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut files = Vec::with_capacity(fetched.len());
        for result in fetched {
            match result {
                Ok(file) => files.push(file),
                Err(skip) => skipped.push(skip),
            }
        }

        info!(
            repo = %location.full_name(),
            branch = %branch,
            files = files.len(),
            skipped = skipped.len(),
            "Scraped repository"
        );

        Ok(ScrapedRepository {
            owner: location.owner.clone(),
            repo: display_name,
            branch,
            files,
            skipped,
            truncated: tree.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::sources::github::client::tests::{fake_github, serve, test_config};

    fn selection(url: &str) -> RepoSelection {
        RepoSelection {
            html_url: url.to_string(),
            name: None,
        }
    }

    fn entry(path: &str, size: u64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: TreeEntryKind::Blob,
            sha: "x".to_string(),
            size: Some(size),
        }
    }

    #[test]
    fn test_filter_decisions() {
        let config = SourcesConfig {
            max_file_bytes: 100,
            ..SourcesConfig::default()
        };
        let filter = FileFilter::new(&config, None);
        assert_eq!(filter.decide(&entry("a.rs", 10)), Decision::Keep);
        assert_eq!(filter.decide(&entry("app.exe", 10)), Decision::Ignore);
        assert_eq!(filter.decide(&entry("img/logo.PNG", 10)), Decision::Ignore);
        assert!(matches!(filter.decide(&entry("huge.rs", 101)), Decision::Skip(_)));

        let dir = TreeEntry {
            kind: TreeEntryKind::Tree,
            ..entry("src", 0)
        };
        assert_eq!(filter.decide(&dir), Decision::Ignore);
    }

    #[test]
    fn test_filter_allowed_extensions() {
        let allowed = vec![".RS".to_string(), "md".to_string()];
        let filter = FileFilter::new(&SourcesConfig::default(), Some(&allowed));
        assert_eq!(filter.decide(&entry("lib.rs", 1)), Decision::Keep);
        assert_eq!(filter.decide(&entry("README.md", 1)), Decision::Keep);
        assert_eq!(filter.decide(&entry("main.py", 1)), Decision::Ignore);
        assert_eq!(filter.decide(&entry("Makefile", 1)), Decision::Ignore);
    }

    #[test]
    fn test_formatted_text_and_extensions() {
        let outcome = ScrapeOutcome {
            repositories: vec![ScrapedRepository {
                owner: "octo".to_string(),
                repo: "hello".to_string(),
                branch: "main".to_string(),
                files: vec![
                    ScrapedFile {
                        repo: "hello".to_string(),
                        path: "a.rs".to_string(),
                        text: "fn a() {}".to_string(),
                    },
                    ScrapedFile {
                        repo: "hello".to_string(),
                        path: "b.md".to_string(),
                        text: "# B".to_string(),
                    },
                    ScrapedFile {
                        repo: "hello".to_string(),
                        path: "c.rs".to_string(),
                        text: String::new(),
                    },
                ],
                skipped: Vec::new(),
                truncated: false,
            }],
        };
        assert_eq!(
            outcome.formatted_text(),
            "Repository: hello\nFile: a.rs\n\nfn a() {}\n\n\
             Repository: hello\nFile: b.md\n\n# B\n\n\
             Repository: hello\nFile: c.rs\n\n"
        );
        assert_eq!(outcome.extensions(), vec!["md".to_string(), "rs".to_string()]);
    }

    #[tokio::test]
    async fn test_scrape_repository_root() {
        let base = serve(fake_github(Arc::new(AtomicUsize::new(0)))).await;
        let config = test_config(&base);
        let client = GithubClient::new(&config).unwrap();
        let scraper = RepositoryScraper::new(&client, &config);

        let scraped = scraper
            .scrape("good", &selection("https://github.com/octo/hello"), &ScrapeOptions::default())
            .await
            .unwrap();

        assert_eq!(scraped.branch, "main");
        let paths: Vec<_> = scraped.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/lib.rs", "docs/guide.md"]);
        assert_eq!(scraped.skipped.len(), 1);
        assert_eq!(scraped.skipped[0].path, "big.txt");
        assert_eq!(scraped.files[1].text, "pub fn hello() {}");
    }

    #[tokio::test]
    async fn test_scrape_sub_path_keeps_full_paths() {
        let base = serve(fake_github(Arc::new(AtomicUsize::new(0)))).await;
        let config = test_config(&base);
        let client = GithubClient::new(&config).unwrap();
        let scraper = RepositoryScraper::new(&client, &config);

        let scraped = scraper
            .scrape(
                "good",
                &selection("https://github.com/octo/hello/tree/main/docs"),
                &ScrapeOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(scraped.files.len(), 1);
        assert_eq!(scraped.files[0].path, "docs/guide.md");
        assert_eq!(scraped.files[0].text, "Read me first");
    }

    #[tokio::test]
    async fn test_scrape_rejected_token_is_fatal() {
        let base = serve(fake_github(Arc::new(AtomicUsize::new(0)))).await;
        let config = test_config(&base);
        let client = GithubClient::new(&config).unwrap();
        let scraper = RepositoryScraper::new(&client, &config);

        let options = ScrapeOptions {
            branch: Some("main".to_string()),
            extensions: None,
        };
        let result = scraper
            .scrape_all("bad", &[selection("https://github.com/octo/hello")], &options)
            .await;
        assert!(matches!(result, Err(SourceError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_scrape_invalid_url() {
        let config = SourcesConfig::default();
        let client = GithubClient::new(&config).unwrap();
        let scraper = RepositoryScraper::new(&client, &config);
        let result = scraper
            .scrape("good", &selection("https://example.com/x/y"), &ScrapeOptions::default())
            .await;
        assert!(matches!(result, Err(SourceError::InvalidRepositoryUrl(_))));
    }
}
