//! Best-effort JSON extraction from model output.
//!
//! Model responses are supposed to be a raw JSON object but routinely
//! arrive wrapped in prose, markdown fences, or with stray text around the
//! braces. `extract_json_from_text` never fails: the worst case is a
//! sentinel object carrying an `extraction_error` marker and the original
//! text verbatim, which downstream code treats as the degraded path.

use serde_json::{json, Value};
use tracing::debug;

/// Key present on the sentinel object when no JSON could be recovered.
pub const EXTRACTION_ERROR_KEY: &str = "extraction_error";

/// Recovers a JSON value from arbitrary response text.
///
/// Strategy, in order:
/// 1. Parse the entire text as JSON.
/// 2. Strip markdown code fences and parse again.
/// 3. Collect brace-delimited candidate spans — the wide span from the
///    first `{` to the last `}`, plus the balanced span starting at each
///    `{` — and try them longest-first (the most complete match is assumed
///    most likely to be the full intended object).
/// 4. Return the sentinel object with the input preserved verbatim.
///
/// Pure and side-effect-free apart from debug logging.
pub fn extract_json_from_text(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }

    let stripped = strip_json_fences(text);
    if stripped != text {
        if let Ok(value) = serde_json::from_str::<Value>(stripped) {
            debug!("Extracted JSON after stripping code fences");
            return value;
        }
    }

    let mut candidates = brace_candidates(text);
    // Longest-first; the sort is stable so equal-length spans keep
    // left-to-right order.
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    for candidate in candidates {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            debug!(
                "Extracted JSON from a {}-byte brace span of {}-byte response",
                candidate.len(),
                text.len()
            );
            return value;
        }
    }

    json!({
        "extraction_error": "Could not extract valid JSON",
        "raw_text": text,
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| stripped.trim_start())
    } else {
        text
    }
}

/// Collects brace-delimited candidate spans from the text.
///
/// Includes the wide first-`{`-to-last-`}` span (which covers nested
/// braces in one greedy match) and, for every `{`, the balanced span from
/// it to its matching `}` tracked string- and escape-aware.
fn brace_candidates(text: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = Vec::new();

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            candidates.push(&text[first..=last]);
        }
    }

    for (offset, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        if let Some(span) = balanced_span(&text[offset..]) {
            if !candidates.contains(&span) {
                candidates.push(span);
            }
        }
    }

    candidates
}

/// Returns the balanced `{...}` span at the start of `text`, or None if
/// the opening brace never closes. Braces inside string literals and
/// escaped quotes do not count toward the depth.
fn balanced_span(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
