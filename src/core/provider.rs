//! The external identity/data sources a user can connect.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A connectable provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// GitHub (repositories).
    #[serde(alias = "GitHub")]
    Github,
    /// Google (Drive files).
    #[serde(alias = "google-drive", alias = "drive")]
    Google,
}

impl Provider {
    /// Stable lowercase identifier, used in URLs and metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    /// Display name of the provider.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Google => "Google Drive",
        }
    }

    /// Dashboard path the browser lands on after signing in.
    #[must_use]
    pub const fn dashboard_path(self) -> &'static str {
        match self {
            Self::Github => "/github-dashboard",
            Self::Google => "/google-drive-dashboard",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "google" | "google-drive" | "drive" => Ok(Self::Google),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}
