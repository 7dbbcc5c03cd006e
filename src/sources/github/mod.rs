//! GitHub source: URL parsing, REST client and repository scraper.

pub mod client;
pub mod scrape;
pub mod types;
pub mod url;

pub use client::GithubClient;
pub use scrape::{RepositoryScraper, ScrapeOptions, ScrapeOutcome};
pub use types::{
    Branch, GithubUser, RepoSelection, Repository, ScrapedFile, ScrapedRepository, SkippedFile,
};
pub use url::{RepoLocation, parse_repo_url};
