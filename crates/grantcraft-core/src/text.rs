//! Word-count and keyword heuristics shared by the analyzers.

use crate::rules::{CHARS_PER_LINE, WORDS_PER_PAGE};
use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6]|/tr|p|div|li|h[1-6])\b[^>]*>")
        .expect("valid block tag regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static INLINE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f]+").expect("valid ws regex"));
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+(\s|$)").expect("valid sentence regex"));

/// Convert HTML editor output into plain text. Block-level tags become line
/// breaks so headings survive for [`find_headings`].
pub fn strip_html(input: &str) -> String {
    if !input.contains('<') && !input.contains('&') {
        return normalize_whitespace(input);
    }

    let with_breaks = BLOCK_TAG.replace_all(input, "\n");
    let without_tags = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    normalize_whitespace(&decoded)
}

fn normalize_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| INLINE_WS.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn sentence_count(text: &str) -> usize {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let terminated = SENTENCE_END.find_iter(trimmed).count();
    // A trailing fragment without punctuation still counts as a sentence.
    let ends_cleanly = trimmed
        .chars()
        .last()
        .map(|c| matches!(c, '.' | '!' | '?'))
        .unwrap_or(false);
    if ends_cleanly {
        terminated
    } else {
        terminated + 1
    }
}

/// Estimated rendered pages, rounded up to the next tenth.
pub fn estimate_pages(text: &str) -> f64 {
    let words = word_count(text) as f64;
    (words / WORDS_PER_PAGE * 10.0).ceil() / 10.0
}

pub fn estimate_lines(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.chars().count().div_ceil(CHARS_PER_LINE))
        .sum()
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// Number of distinct keywords from `keywords` present in `text`.
pub fn count_keywords(text: &str, keywords: &[&str]) -> usize {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|k| lower.contains(&k.to_lowercase()))
        .count()
}

/// Returns the subset of `headings` that appear as a heading line in `text`.
///
/// A heading line is one that starts with the heading (ignoring case, leading
/// numbering such as `A.` or `2.` and markdown `#`) and is short enough not to
/// be body prose.
pub fn find_headings<'a>(text: &str, headings: &[&'a str]) -> Vec<&'a str> {
    let lines: Vec<String> = text
        .lines()
        .map(|l| heading_candidate(l).to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();

    headings
        .iter()
        .filter(|heading| {
            let wanted = heading.to_lowercase();
            lines
                .iter()
                .any(|line| line.starts_with(&wanted) && line.len() <= wanted.len() + 60)
        })
        .copied()
        .collect()
}

/// Strips list markers and numbering from a line so it can be compared to a heading.
pub fn heading_candidate(line: &str) -> &str {
    let mut rest = line.trim().trim_start_matches('#').trim_start();
    // "A. ", "2. ", "C.3 ", "IV) " style prefixes
    if let Some((prefix, tail)) = rest.split_once(|c: char| c == ' ') {
        let is_numbering = prefix.len() <= 5
            && prefix
                .trim_end_matches(['.', ')', ':'])
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
            && prefix.ends_with(['.', ')'])
            && prefix.chars().filter(|c| c.is_ascii_alphabetic()).count() <= 4;
        if is_numbering {
            rest = tail.trim_start();
        }
    }
    rest.trim_end_matches(':').trim()
}
