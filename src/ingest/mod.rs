//! Turning text into stored embeddings.

pub mod chunker;
pub mod namespace;
pub mod pipeline;

pub use chunker::TextChunker;
pub use namespace::{Namespace, drive_resource_id, github_resource_id};
pub use pipeline::{IngestPipeline, IngestReport, IngestRequest, SearchHit};
