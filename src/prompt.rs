//! Prompt assembly: schema instruction plus a character-budgeted context block.

use crate::document::{RetrievalResult, anchor_list};

/// Fixed instruction block specifying the required response schema.
pub const RESPONSE_INSTRUCTION: &str = r#"You are a data analysis assistant. Respond ONLY with valid JSON.

REQUIRED JSON FORMAT (no extra text):
{
  "answer": "Complete answer based on the provided data",
  "citations": [
    {
      "file_id": "exact_file_id_from_source",
      "file_name": "exact_filename_from_source",
      "anchors": "specific_location_info",
      "snippet": "relevant_text_under_100_chars",
      "confidence": 0.95
    }
  ]
}

RULES:
- Answer must be informative and complete
- Include citations for every fact mentioned
- Use exact file_id and file_name from SOURCE entries
- Keep snippets under 100 characters
- Confidence: 0.0-1.0 based on relevance
- If no data matches query: empty citations array
- Output must be valid JSON only"#;

const SOURCE_SEPARATOR: &str = "\n\n";

/// Assemble the full prompt: instruction block, context section, question.
pub fn build_prompt(query: &str, retrieved: &[RetrievalResult], max_context_chars: usize) -> String {
    let context = match render_context(retrieved, max_context_chars) {
        Some(context) => context,
        None => "No relevant data available.".to_string(),
    };
    format!(
        "{RESPONSE_INSTRUCTION}\n\nCONTEXT:\n{context}\n\nQUESTION: {query}\n\nProvide your response as valid JSON:"
    )
}

/// Render the provenance-annotated context section, one line per retrieval
/// result in merged order:
/// `SOURCE[<file_id>|<file_name>|<anchor_list>]: <text>`.
///
/// Appending stops as soon as the next line would push the section past
/// `max_context_chars` — lines are never truncated mid-line and never
/// reordered for better packing. Returns `None` when no line fits.
pub fn render_context(retrieved: &[RetrievalResult], max_context_chars: usize) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut total = 0usize;

    for result in retrieved {
        let line = format!(
            "SOURCE[{}|{}|{}]: {}",
            result.file_id(),
            result.file_name(),
            anchor_list(&result.metadata),
            result.text,
        );
        let cost =
            line.len() + if lines.is_empty() { 0 } else { SOURCE_SEPARATOR.len() };
        if total + cost > max_context_chars {
            break;
        }
        total += cost;
        lines.push(line);
    }

    if lines.is_empty() { None } else { Some(lines.join(SOURCE_SEPARATOR)) }
}
