//! Ticket identifier extraction from heterogeneous result rows.

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

// UUID-shaped substrings (8-4-4-4-12 hex groups, version nibble 1-5),
// case-insensitive. Matches take precedence over generic tokenization.
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern")
});

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,;]+").expect("split pattern"));

/// Pull candidate ticket identifiers out of result rows.
///
/// For every row and every configured field present on it, the raw value is
/// coerced to text (arrays joined with commas). UUID matches are emitted
/// lowercased and suppress any other tokenization of that value; otherwise
/// the text is split on whitespace/commas/semicolons and the non-empty
/// tokens are emitted verbatim. The result is deduplicated in
/// first-occurrence order.
pub fn extract_identifiers(
    rows: &[serde_json::Map<String, Value>],
    field_names: &[String],
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        for field in field_names {
            let Some(value) = row.get(field) else {
                continue;
            };
            let Some(text) = value_to_text(value) else {
                continue;
            };
            for token in tokens_from_text(&text) {
                if seen.insert(token.clone()) {
                    out.push(token);
                }
            }
        }
    }
    out
}

fn tokens_from_text(text: &str) -> Vec<String> {
    let uuids: Vec<String> = UUID_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect();
    if !uuids.is_empty() {
        return uuids;
    }
    SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(element_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

fn element_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
