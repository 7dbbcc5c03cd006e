//! Google Drive source: REST client, export rules and file scraping.

pub mod client;
pub mod export;
pub mod scrape;
pub mod types;

pub use client::{DriveClient, FileContent};
pub use export::{ContentPlan, plan_for};
pub use scrape::{download_archive, scrape_files};
pub use types::{DriveDocument, DriveFile, DriveScrape, FailedFile, FileList};
