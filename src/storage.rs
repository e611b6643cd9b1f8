//! Document store seam: resolve uploaded documents by ID.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Coarse document type, derived from the stored file's extension and used to
/// pick a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// CSV or spreadsheet formats.
    Tabular,
    /// PDF.
    Pdf,
    /// Plain text and text-like formats.
    Text,
    /// Unrecognized extension; the indexer tries the tabular parser first,
    /// then falls back to raw text.
    Unknown,
}

impl DocumentKind {
    /// Classify a file extension (with or without the leading dot).
    pub fn from_extension(extension: &str) -> Self {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "xls" | "xlsx" | "xlsm" | "xlsb" => Self::Tabular,
            "pdf" => Self::Pdf,
            "txt" | "text" | "md" => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Classify a file name by its extension.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.rsplit_once('.') {
            Some((_, extension)) => Self::from_extension(extension),
            None => Self::Unknown,
        }
    }
}

/// A stored document resolved from an upload record.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// The document identifier the upload was stored under.
    pub document_id: String,
    /// The original file name, kept for citation display.
    pub file_name: String,
    /// Detected document type.
    pub kind: DocumentKind,
    /// Raw file bytes.
    pub content: Vec<u8>,
}

/// External collaborator that persists uploaded files and their metadata.
///
/// The upload record is the source of truth for document existence: a
/// document that does not resolve here is treated as gone, not retried.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve a document ID to its stored file, or `None` if unknown.
    async fn resolve(&self, document_id: &str) -> Result<Option<StoredDocument>>;

    /// Delete the stored file. Deleting an unknown document succeeds.
    async fn delete(&self, document_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch() {
        assert_eq!(DocumentKind::from_file_name("stats.XLSX"), DocumentKind::Tabular);
        assert_eq!(DocumentKind::from_file_name("report.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("notes.txt"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_file_name("archive.zip"), DocumentKind::Unknown);
        assert_eq!(DocumentKind::from_file_name("no_extension"), DocumentKind::Unknown);
    }
}
