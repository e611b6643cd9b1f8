//! Document parser seam.
//!
//! Concrete format parsers (spreadsheet readers, PDF extractors) live outside
//! this crate; only their output shape contract matters here. A parser hands
//! back [`ParsedContent`] — a string, a record, or a mixed sequence — and the
//! normalizer takes it from there. Records should carry their stable `id` and
//! a `meta` object with locator fields (`sheet`, `row_index`, `page`,
//! `table`, `paragraph_index`) so citations can anchor back to the source.

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::normalize::ParsedContent;
use crate::storage::StoredDocument;

/// Format-specific parsing of a stored document into normalizable content.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse a tabular document (CSV, spreadsheet) into row records.
    async fn parse_tabular(&self, document: &StoredDocument) -> Result<ParsedContent>;

    /// Parse a PDF into table-row records and paragraph text.
    async fn parse_pdf(&self, document: &StoredDocument) -> Result<ParsedContent>;

    /// Parse a document as raw text. The default implementation decodes the
    /// bytes as UTF-8, replacing invalid sequences, and never fails — it is
    /// the terminal fallback for unrecognized formats.
    async fn parse_text(&self, document: &StoredDocument) -> Result<ParsedContent> {
        Ok(ParsedContent::Text(String::from_utf8_lossy(&document.content).into_owned()))
    }
}

/// A parser that only handles raw text.
///
/// Tabular and PDF parsing report [`RagError::Parse`], which routes unknown
/// document types through the indexer's raw-text fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn parse_tabular(&self, document: &StoredDocument) -> Result<ParsedContent> {
        Err(RagError::Parse(format!(
            "no tabular parser available for '{}'",
            document.file_name
        )))
    }

    async fn parse_pdf(&self, document: &StoredDocument) -> Result<ParsedContent> {
        Err(RagError::Parse(format!("no PDF parser available for '{}'", document.file_name)))
    }
}
