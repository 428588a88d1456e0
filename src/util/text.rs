use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Strips embedded markup tags from text, leaving plain prose.
///
/// Each tag is replaced with a space before whitespace collapsing, so words
/// separated only by adjacent tags (`foo</b><i>bar`) do not concatenate.
/// Runs of whitespace (including newlines left over from markup) collapse
/// to a single literal space and the result is trimmed.
pub fn strip_tags(s: &str) -> String {
    let without_tags = tag_pattern().replace_all(s, " ");
    collapse_whitespace(&without_tags)
}

/// Collapses every run of whitespace to a single space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_gap = false;
    for c in s.chars() {
        if c.is_whitespace() {
            in_gap = true;
        } else {
            if in_gap && !out.is_empty() {
                out.push(' ');
            }
            in_gap = false;
            out.push(c);
        }
    }
    out
}

/// Truncates a string to at most `max_chars` characters, never splitting a
/// multi-byte character. Byte-index truncation would panic on CJK summaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
