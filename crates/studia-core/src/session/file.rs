//! Files attached to a study session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file uploaded into a session.
///
/// The file is visible as soon as it is staged, but only becomes usable as
/// conversational context once `summary` is populated by the Historian.
/// `None` means "not usable yet"; it is never replaced by an empty string on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Unique identifier for the uploaded file
    pub id: String,
    /// Original filename
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// MIME type of the file
    pub mime_type: String,
    /// Timestamp when the file was uploaded
    pub uploaded_at: DateTime<Utc>,
    /// Raw content, base64 encoded
    pub content: String,
    /// Dense extractive summary produced after upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl UploadedFile {
    pub fn is_summarized(&self) -> bool {
        self.summary.is_some()
    }
}
