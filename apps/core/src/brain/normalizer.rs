//! Markdown stripping for provider output.
//!
//! Every provider is asked for plain text, but most answer in markdown anyway.
//! `normalize` removes the lightweight markup so all providers look alike.

use regex::Regex;
use std::sync::LazyLock;

// NOTE: expect() is acceptable here: the patterns are constants.
static HEADERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("Invalid regex: headers"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid regex: bold stars"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").expect("Invalid regex: bold underscores"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("Invalid regex: italic star"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(.+?)_").expect("Invalid regex: italic underscore"));
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\-\*_]{3,}$").expect("Invalid regex: horizontal rule"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("Invalid regex: inline code"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^\)]+\)").expect("Invalid regex: link"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[\-\*]\s+").expect("Invalid regex: bullet"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("Invalid regex: numbered list"));
static TABLE_PIPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|").expect("Invalid regex: table pipe"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex: blank lines"));

/// Strips markdown from `raw`, returning plain text.
///
/// Emphasis is removed before list markers so `- **bold**` keeps its text.
/// Passes repeat until the text stops changing; every pass only ever removes
/// characters, so this terminates and the result is a fixed point.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut current = single_pass(raw);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn single_pass(text: &str) -> String {
    let text = HEADERS.replace_all(text, "");
    let text = BOLD_STARS.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORES.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "$1");
    let text = HORIZONTAL_RULE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = BULLET.replace_all(&text, "");
    let text = NUMBERED.replace_all(&text, "");
    let text = TABLE_PIPE.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_returned_unchanged() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(normalize("  Open the Sales Invoice list.  "), "Open the Sales Invoice list.");
    }

    #[test]
    fn test_headers_and_emphasis() {
        let raw = "### Steps\n**Go** to *Selling* and __save__ the _draft_";
        assert_eq!(normalize(raw), "Steps\nGo to Selling and save the draft");
    }

    #[test]
    fn test_bullets_keep_emphasised_text() {
        let raw = "- **Customer** first\n* then items";
        assert_eq!(normalize(raw), "Customer first\nthen items");
    }

    #[test]
    fn test_numbered_links_code_and_tables() {
        let raw = "1. Open [the docs](https://docs.example.com)\n2. Run `bench migrate`\n| a | b |";
        assert_eq!(normalize(raw), "Open the docs\nRun bench migrate\n a  b");
    }

    #[test]
    fn test_horizontal_rule_and_blank_lines() {
        let raw = "Intro\n---\n\n\n\nOutro";
        assert_eq!(normalize(raw), "Intro\n\nOutro");
    }

    #[test]
    fn test_nested_list_markers_are_fully_removed() {
        assert_eq!(normalize("- - item"), "item");
    }
}
