//! Repair chain for structured model output.
//!
//! The generative backend is a free-text channel that merely promises JSON.
//! [`parse_model_output`] runs an ordered chain of pure strategies until one
//! decodes, so each repair stays independently testable:
//!
//! 1. direct decode
//! 2. decode after stripping a markdown code fence
//! 3. greedy extraction of the first brace-delimited span
//! 4. truncation to the last balanced brace-matched prefix
//!
//! If none succeeds the caller falls back to deterministic synthesis; this
//! module never invents content.

use serde_json::Value;
use tracing::debug;

/// A single repair strategy: decode or decline, no side effects.
pub type RepairStrategy = fn(&str) -> Option<Value>;

/// The ordered strategy chain, most-direct first.
pub const STRATEGIES: [(&str, RepairStrategy); 4] = [
    ("direct", decode_direct),
    ("strip_code_fence", decode_stripped_fence),
    ("first_braced_span", decode_first_braced_span),
    ("balanced_prefix", decode_balanced_prefix),
];

/// Decode possibly-malformed model output, applying each strategy in order
/// until one succeeds.
pub fn parse_model_output(text: &str) -> Option<Value> {
    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(text) {
            debug!(strategy = name, "model output decoded");
            return Some(value);
        }
    }
    debug!("model output survived no repair strategy");
    None
}

/// Strategy 1: the output is already valid JSON.
fn decode_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// Strategy 2: the output is valid JSON wrapped in a markdown code fence.
fn decode_stripped_fence(text: &str) -> Option<Value> {
    let mut stripped = text.trim();
    stripped = stripped
        .strip_prefix("```json")
        .or_else(|| stripped.strip_prefix("```"))
        .unwrap_or(stripped);
    stripped = stripped.strip_suffix("```").unwrap_or(stripped);
    serde_json::from_str(stripped.trim()).ok()
}

/// Strategy 3: a JSON object is buried in surrounding prose. Greedy span from
/// the first `{` to the last `}`.
fn decode_first_braced_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Strategy 4: trailing garbage after the object, or output cut off
/// mid-object. Scan from the first `{` to the point where the opened braces
/// balance (string-aware, so braces inside string values don't count) and
/// decode that prefix.
fn decode_balanced_prefix(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut balanced_end = None;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    balanced_end = Some(start + offset + ch.len_utf8());
                    break;
                }
            }
            _ => {}
        }
    }

    let end = balanced_end?;
    serde_json::from_str(&text[start..end]).ok()
}
