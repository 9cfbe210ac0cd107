//! Textual reference-range extraction.
//!
//! Pulls the displayed normal range (or single bound) out of a value
//! fragment. Purely textual; turning the range into numeric bounds is
//! the status classifier's job.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder returned when the fragment shows no range.
pub const NOT_SPECIFIED: &str = "Not specified";

// "(норма: 130,00 - 160,00)", the dominant Russian layout.
static PAREN_NORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(норма:\s*([^)]+)\)").unwrap());

// "норма: 130,00 - 160,00" without parentheses.
static BARE_NORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)норма:\s*(\S+(?:\s+\S+)*?)(?:\s*$)").unwrap());

// Any parenthesized content holding at least one number.
static PAREN_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*\d[^)]*)\)").unwrap());

// "A - B" numeric interval, en dash tolerated.
static NUMERIC_INTERVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+[.,]?\d*\s*[-–]\s*\d+[.,]?\d*)").unwrap());

/// Extract the displayed reference range from a value fragment.
///
/// Tries the labelled "норма" forms first, then any parenthesized content
/// that itself looks like a numeric interval, then a bare interval
/// anywhere in the fragment. Returns [`NOT_SPECIFIED`] when nothing
/// matches.
pub fn extract_reference_range(value_text: &str) -> String {
    if let Some(caps) = PAREN_NORM.captures(value_text) {
        return caps[1].trim().to_string();
    }

    if let Some(caps) = BARE_NORM.captures(value_text) {
        return caps[1].trim().to_string();
    }

    if let Some(caps) = PAREN_NUMERIC.captures(value_text) {
        let content = caps[1].trim();
        if NUMERIC_INTERVAL.is_match(content) {
            return content.to_string();
        }
    }

    if let Some(caps) = NUMERIC_INTERVAL.captures(value_text) {
        return caps[1].trim().to_string();
    }

    NOT_SPECIFIED.to_string()
}
