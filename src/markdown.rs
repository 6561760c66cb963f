//! Narrative-text sanitation.

use regex::Regex;
use std::sync::LazyLock;

// A fenced block tagged `json` (case-insensitive), matched non-greedily
// through the next closing fence.
static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json[ \t]*\r?\n.*?```").expect("fence pattern"));

/// Strip embedded raw-data blocks from narrative markdown before display.
///
/// Removes every fenced `json` block and trims the result. Idempotent;
/// empty input yields an empty string.
pub fn sanitize_markdown(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    JSON_FENCE_RE.replace_all(markdown, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_fenced_json_and_keeps_surrounding_text() {
        let input = "intro \n```json\n{\"a\":1}\n```\n outro";
        let expected = "intro \n\n outro".trim().to_string();
        assert_eq!(sanitize_markdown(input), expected);
    }

    #[test]
    fn is_idempotent() {
        let input = "before\n```JSON\n[1, 2]\n```\nafter";
        let once = sanitize_markdown(input);
        assert_eq!(sanitize_markdown(&once), once);
    }

    #[test]
    fn removes_multiple_blocks_non_greedily() {
        let input = "a\n```json\n{}\n```\nb\n```json\n[]\n```\nc";
        assert_eq!(sanitize_markdown(input), "a\n\nb\n\nc");
    }

    #[test]
    fn leaves_other_languages_alone() {
        let input = "x\n```rust\nfn main() {}\n```\ny";
        assert_eq!(sanitize_markdown(input), input);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(sanitize_markdown(""), "");
    }
}
