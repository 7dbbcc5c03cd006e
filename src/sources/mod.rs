//! Content providers: GitHub repositories and Google Drive files.

pub mod archive;
pub mod drive;
pub mod error;
pub mod github;
pub mod http;

pub use error::SourceError;
