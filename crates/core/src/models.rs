use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Lifecycle state of a registered document. A record is created as
/// `Uploaded` and flips to `Ingested` exactly once, after all of its
/// chunks have been written to the vector index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Ingested,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Ingested => "ingested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(DocumentStatus::Uploaded),
            "ingested" => Some(DocumentStatus::Ingested),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    /// Original filename as uploaded, untrusted.
    pub filename: String,
    /// Sanitized unique path; the only key used to address the
    /// document in the vector index and on disk.
    pub stored_path: String,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
}

/// A contiguous span of a document's extracted text, the unit indexed
/// for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    /// Canonical identifier of the owning document (its stored path).
    pub source: String,
    pub text: String,
}

/// A chunk returned by similarity search, lower distance is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedHit {
    pub text: String,
    pub source: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub context: String,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<String>,
}

/// User-facing attribution label for a source key: its final path
/// component, or the key itself when it has none.
pub fn source_basename(source: &str) -> String {
    Path::new(source)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| source.to_string())
}
