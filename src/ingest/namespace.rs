//! Namespaces and resource ids.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{HubError, HubResult};

/// Partition of the vector store holding one resource's chunks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate a namespace; surrounding whitespace is dropped.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidInput`] if nothing is left after trimming.
    pub fn new(value: impl Into<String>) -> HubResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(HubError::InvalidInput("namespace must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// `{owner}/{repo}/{branch}/{path}` for a repository file.
    ///
    /// # Errors
    /// Returns an error if every component is empty.
    pub fn for_github_file(owner: &str, repo: &str, branch: &str, path: &str) -> HubResult<Self> {
        Self::new(format!(
            "{owner}/{repo}/{branch}/{}",
            path.trim_start_matches('/')
        ))
    }

    /// `drive/{file_id}` for a Drive file.
    ///
    /// # Errors
    /// Returns an error if the file id is empty.
    pub fn for_drive_file(file_id: &str) -> HubResult<Self> {
        if file_id.trim().is_empty() {
            return Err(HubError::InvalidInput("file id must not be empty".to_string()));
        }
        Self::new(format!("drive/{}", file_id.trim()))
    }

    /// The namespace string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = HubError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

/// `github/{owner}/{repo}`.
#[must_use]
pub fn github_resource_id(owner: &str, repo: &str) -> String {
    format!("github/{owner}/{repo}")
}

/// `google-drive/{file_id}`.
#[must_use]
pub fn drive_resource_id(file_id: &str) -> String {
    format!("google-drive/{}", file_id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank() {
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("  \t\n").is_err());
        assert_eq!(Namespace::new("  a/b ").unwrap().as_str(), "a/b");
    }

    #[test]
    fn test_constructors() {
        let ns = Namespace::for_github_file("octo", "hello", "main", "/src/lib.rs").unwrap();
        assert_eq!(ns.as_str(), "octo/hello/main/src/lib.rs");
        assert_eq!(Namespace::for_drive_file("abc").unwrap().as_str(), "drive/abc");
        assert!(Namespace::for_drive_file(" ").is_err());
        assert_eq!(github_resource_id("octo", "hello"), "github/octo/hello");
        assert_eq!(drive_resource_id("abc"), "google-drive/abc");
    }

    #[test]
    fn test_serde_validates() {
        let ns: Result<Namespace, _> = serde_json::from_str("\"drive/abc\"");
        assert_eq!(ns.unwrap().to_string(), "drive/abc");
        let blank: Result<Namespace, _> = serde_json::from_str("\"   \"");
        assert!(blank.is_err());
    }
}
