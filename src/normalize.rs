//! Chunk normalization: arbitrary parser output → ordered, addressable chunks.
//!
//! Parsers hand back whatever shape their format suggests: a single blob of
//! text, a single record (one spreadsheet row, one table cell group), or a
//! mixed sequence of both. [`normalize`] flattens any of these into a stable,
//! ordered sequence of [`Chunk`]s with deterministic IDs, so that re-indexing
//! a document with identical parser output upserts the same IDs.
//!
//! Normalization is total: it never fails on malformed shapes. A record that
//! carries no recognizable text is stringified verbatim as a last resort, so
//! no input is dropped silently.

use serde_json::{Map, Value};

use crate::document::{Chunk, Metadata, plain_value};

/// Priority list of record keys likely to hold the textual content.
const TEXT_KEYS: [&str; 6] = ["text", "content", "document", "row_text", "chunk", "excerpt"];

/// Parser output, dispatched once by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    /// A bare string; word-chunked into pieces.
    Text(String),
    /// A key/value record, e.g. one spreadsheet row.
    Record(Map<String, Value>),
    /// An ordered sequence of nested content, processed element-by-element.
    Sequence(Vec<ParsedContent>),
}

impl From<Value> for ParsedContent {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ParsedContent::Text(s),
            Value::Object(map) => ParsedContent::Record(map),
            Value::Array(items) => {
                ParsedContent::Sequence(items.into_iter().map(ParsedContent::from).collect())
            }
            other => ParsedContent::Text(other.to_string()),
        }
    }
}

/// Normalize parser output into an ordered sequence of chunks.
///
/// `default_metadata` is attached to every chunk; metadata embedded in a
/// record under its `meta` key takes precedence on key conflicts. Output
/// order matches input order, and chunks that are empty after trimming are
/// discarded.
pub fn normalize(
    content: &ParsedContent,
    document_id: &str,
    default_metadata: &Metadata,
    max_words: usize,
) -> Vec<Chunk> {
    let mut out = Vec::new();
    match content {
        ParsedContent::Text(text) => {
            push_text_chunks(&mut out, text, document_id, "text", default_metadata, max_words);
        }
        ParsedContent::Record(record) => {
            push_record_chunks(
                &mut out,
                record,
                &format!("{document_id}::item=0"),
                default_metadata,
                max_words,
            );
        }
        ParsedContent::Sequence(items) => {
            push_sequence_chunks(&mut out, items, document_id, default_metadata, max_words);
        }
    }
    out
}

fn push_sequence_chunks(
    out: &mut Vec<Chunk>,
    items: &[ParsedContent],
    prefix: &str,
    default_metadata: &Metadata,
    max_words: usize,
) {
    for (position, item) in items.iter().enumerate() {
        let scope = format!("{prefix}::item={position}");
        match item {
            ParsedContent::Text(text) => {
                push_scoped_text_chunks(out, text, &scope, default_metadata, max_words);
            }
            ParsedContent::Record(record) => {
                push_record_chunks(out, record, &scope, default_metadata, max_words);
            }
            ParsedContent::Sequence(nested) => {
                push_sequence_chunks(out, nested, &scope, default_metadata, max_words);
            }
        }
    }
}

/// Top-level text: chunk IDs use a running counter as the locator.
fn push_text_chunks(
    out: &mut Vec<Chunk>,
    text: &str,
    document_id: &str,
    locator_kind: &str,
    default_metadata: &Metadata,
    max_words: usize,
) {
    for (index, piece) in split_into_word_chunks(text, max_words).into_iter().enumerate() {
        out.push(Chunk {
            id: format!("{document_id}::{locator_kind}={index}"),
            text: piece,
            metadata: default_metadata.clone(),
        });
    }
}

/// Sequence-element text: the element position is the locator; a sub-index is
/// appended only when word-splitting produced more than one piece.
fn push_scoped_text_chunks(
    out: &mut Vec<Chunk>,
    text: &str,
    scope: &str,
    default_metadata: &Metadata,
    max_words: usize,
) {
    let pieces = split_into_word_chunks(text, max_words);
    let multiple = pieces.len() > 1;
    for (index, piece) in pieces.into_iter().enumerate() {
        let id = if multiple { format!("{scope}::{index}") } else { scope.to_string() };
        out.push(Chunk { id, text: piece, metadata: default_metadata.clone() });
    }
}

fn push_record_chunks(
    out: &mut Vec<Chunk>,
    record: &Map<String, Value>,
    scope: &str,
    default_metadata: &Metadata,
    max_words: usize,
) {
    let text = record_text(record);
    let metadata = merged_metadata(default_metadata, record);
    // A record may carry its own stable ID from the parser; prefer it.
    let base_id = match record.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => scope.to_string(),
    };
    let pieces = split_into_word_chunks(&text, max_words);
    let multiple = pieces.len() > 1;
    for (index, piece) in pieces.into_iter().enumerate() {
        let id = if multiple { format!("{base_id}::{index}") } else { base_id.clone() };
        out.push(Chunk { id, text: piece, metadata: metadata.clone() });
    }
}

/// Extract the text of a record.
///
/// Checks the priority key list first, then stringifies an `original_row`
/// field as `key=value` pairs, then concatenates all string-valued fields,
/// and finally stringifies the record verbatim so nothing is dropped.
fn record_text(record: &Map<String, Value>) -> String {
    for key in TEXT_KEYS {
        if let Some(Value::String(s)) = record.get(key) {
            if !s.trim().is_empty() {
                return s.trim().to_string();
            }
        }
    }

    match record.get("original_row") {
        Some(Value::Object(row)) => {
            let pairs: Vec<String> = row
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| format!("{key}={}", plain_value(value)))
                .collect();
            if !pairs.is_empty() {
                return pairs.join(" | ");
            }
        }
        Some(Value::Array(items)) => {
            let pieces: Vec<String> = items.iter().map(plain_value).collect();
            if !pieces.is_empty() {
                return pieces.join(" | ");
            }
        }
        _ => {}
    }

    let pieces: Vec<String> = record
        .values()
        .filter_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .collect();
    if !pieces.is_empty() {
        return pieces.join(" | ");
    }

    Value::Object(record.clone()).to_string()
}

/// Union of caller defaults and record-embedded `meta`, record side winning.
fn merged_metadata(default_metadata: &Metadata, record: &Map<String, Value>) -> Metadata {
    let mut metadata = default_metadata.clone();
    if let Some(Value::Object(embedded)) = record.get("meta") {
        for (key, value) in embedded {
            metadata.insert(key.clone(), value.clone());
        }
    }
    metadata
}

/// Split text on runs of whitespace into pieces of at most `max_words` words.
fn split_into_word_chunks(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    words.chunks(max_words.max(1)).map(|window| window.join(" ")).collect()
}
