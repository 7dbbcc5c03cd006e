//! How each Drive MIME type is turned into text.

/// Prefix of Google Workspace (Docs Editors) MIME types.
pub const GOOGLE_NATIVE_PREFIX: &str = "application/vnd.google-apps.";

/// Strategy for reading a file's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentPlan {
    /// Google-native file exported through `files.export`.
    Export {
        /// Target MIME type.
        mime_type: &'static str,
        /// Extension for archive entries.
        extension: &'static str,
    },
    /// Regular file downloaded with `alt=media`.
    Download,
    /// Google-native file with no text export (folders, forms, drawings...).
    Unsupported,
}

/// Pick the plan for a MIME type.
#[must_use]
pub fn plan_for(mime_type: &str) -> ContentPlan {
    let Some(kind) = mime_type.strip_prefix(GOOGLE_NATIVE_PREFIX) else {
        return ContentPlan::Download;
    };
    match kind {
        "document" | "presentation" => ContentPlan::Export {
            mime_type: "text/plain",
            extension: "txt",
        },
        "spreadsheet" => ContentPlan::Export {
            mime_type: "text/csv",
            extension: "csv",
        },
        _ => ContentPlan::Unsupported,
    }
}
