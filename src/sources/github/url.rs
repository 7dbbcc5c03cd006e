//! GitHub repository URL parsing.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sources::error::SourceError;

/// Components of a `https://github.com/{owner}/{repo}[/tree/{ref}[/{path}]]` URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLocation {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch or tag named in the URL.
    pub git_ref: Option<String>,
    /// Sub-directory named in the URL.
    pub path: Option<String>,
}

impl RepoLocation {
    /// `owner/repo`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn repo_url_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^https://github\.com/([^/]+)/([^/]+)(/tree/([^/]+)(/(.+))?)?$").ok()
        })
        .as_ref()
}

/// Parse a GitHub repository URL.
///
/// One trailing `/` is ignored. A `.git` suffix on the repository name is dropped.
///
/// # Errors
/// Returns [`SourceError::InvalidRepositoryUrl`] if the URL does not match.
pub fn parse_repo_url(url: &str) -> Result<RepoLocation, SourceError> {
    let trimmed = url.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let captures = repo_url_regex()
        .and_then(|re| re.captures(trimmed))
        .ok_or_else(|| SourceError::InvalidRepositoryUrl(url.to_string()))?;

    let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string());
    let (Some(owner), Some(repo)) = (group(1), group(2)) else {
        return Err(SourceError::InvalidRepositoryUrl(url.to_string()));
    };
    let repo = repo.strip_suffix(".git").map_or(repo.clone(), ToString::to_string);

    Ok(RepoLocation {
        owner,
        repo,
        git_ref: group(4),
        path: group(6),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_repo() {
        let loc = parse_repo_url("https://github.com/rust-lang/cargo").ok();
        assert_eq!(
            loc,
            Some(RepoLocation {
                owner: "rust-lang".to_string(),
                repo: "cargo".to_string(),
                git_ref: None,
                path: None,
            })
        );
    }

    #[test]
    fn test_trailing_slash_and_git_suffix() {
        let loc = parse_repo_url("https://github.com/octo/hello.git/").ok();
        assert_eq!(loc.map(|l| l.full_name()), Some("octo/hello".to_string()));
    }

    #[test]
    fn test_tree_ref_and_path() {
        let loc = parse_repo_url("https://github.com/octo/hello/tree/dev/docs/guide").ok();
        let loc = loc.unwrap_or_else(|| RepoLocation {
            owner: String::new(),
            repo: String::new(),
            git_ref: None,
            path: None,
        });
        assert_eq!(loc.git_ref.as_deref(), Some("dev"));
        assert_eq!(loc.path.as_deref(), Some("docs/guide"));
    }

    #[test]
    fn test_tree_ref_only() {
        let loc = parse_repo_url("https://github.com/octo/hello/tree/v1.2.0").ok();
        assert_eq!(loc.as_ref().and_then(|l| l.git_ref.as_deref()), Some("v1.2.0"));
        assert_eq!(loc.and_then(|l| l.path), None);
    }

    #[test]
    fn test_rejects_other_hosts_and_shapes() {
        assert!(parse_repo_url("https://gitlab.com/octo/hello").is_err());
        assert!(parse_repo_url("http://github.com/octo/hello").is_err());
        assert!(parse_repo_url("https://github.com/octo").is_err());
        assert!(parse_repo_url("https://github.com/octo/hello/blob/main/README.md").is_err());
    }
}
