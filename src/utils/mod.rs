// src/utils/mod.rs

//! Utility functions and helpers.

pub mod url;

use scraper::Html;
use unicode_segmentation::UnicodeSegmentation;

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce markup to its whitespace-collapsed text; entities are decoded.
///
/// Plain text (no `<` or `&`) skips the HTML parser.
pub fn strip_markup(s: &str) -> String {
    if s.contains('<') || s.contains('&') {
        let fragment = Html::parse_fragment(s);
        collapse_whitespace(&fragment.root_element().text().collect::<Vec<_>>().join(" "))
    } else {
        collapse_whitespace(s)
    }
}

/// Cut a string to at most `max` grapheme clusters.
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    match s.grapheme_indices(true).nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Derive a store-safe site key from a host name.
///
/// Lowercases and replaces every character outside `[a-z0-9]` with `_`.
pub fn site_key_from_host(host: &str) -> String {
    host.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' })
        .collect()
}
