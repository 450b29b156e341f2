//! Value normalization for extracted text.
//!
//! Every parser here returns `None` for input it does not understand; an
//! unparsable count is absent, never zero.

use chrono::{DateTime, NaiveDate};
use cxinfo_core::types::MAX_RATING;

/// Characters used as thousands separators in displayed counts
const GROUP_SEPARATORS: &[char] = &[',', '_', ' ', '\u{a0}', '\u{202f}', '\''];

/// Date layouts seen on listing pages, tried in order
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Abbreviation suffixes and their multipliers, matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixTable {
    entries: Vec<(String, u64)>,
}

impl SuffixTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(suffix, multiplier)| (suffix.as_ref().trim().to_lowercase(), multiplier))
                .filter(|(suffix, multiplier)| !suffix.is_empty() && *multiplier > 0)
                .collect(),
        }
    }

    fn multiplier(&self, suffix: &str) -> Option<u64> {
        let suffix = suffix.to_lowercase();
        self.entries
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, m)| *m)
    }
}

impl Default for SuffixTable {
    fn default() -> Self {
        Self::new([("K", 1_000), ("M", 1_000_000), ("B", 1_000_000_000)])
    }
}

/// Parse a displayed count such as `10,000,000+`, `2.5K` or `1M+`
pub fn parse_count(raw: &str, suffixes: &SuffixTable) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('+')
        .chars()
        .filter(|c| !GROUP_SEPARATORS.contains(c))
        .collect();
    let cleaned = cleaned.trim_end_matches('+');

    let split = cleaned
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(cleaned.len());
    let (mantissa, suffix) = cleaned.split_at(split);
    if mantissa.is_empty() || !mantissa.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    if suffix.is_empty() {
        return parse_plain_count(mantissa);
    }

    let multiplier = suffixes.multiplier(suffix)?;
    let value: f64 = mantissa.parse().ok()?;
    let scaled = (value * multiplier as f64).round();
    if scaled.is_finite() && scaled >= 0.0 && scaled <= u64::MAX as f64 {
        Some(scaled as u64)
    } else {
        None
    }
}

/// Integer without suffix. Dots are accepted only as thousands groups
/// (`1.234.567`); a bare fraction is not a count.
fn parse_plain_count(digits: &str) -> Option<u64> {
    if !digits.contains('.') {
        return digits.parse().ok();
    }

    let mut groups = digits.split('.');
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 {
        return None;
    }
    let mut joined = head.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        joined.push_str(group);
    }
    joined.parse().ok()
}

/// Parse a rating in `[0, 5]`, accepting a decimal comma
pub fn parse_rating(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let value: f64 = match trimmed.parse() {
        Ok(v) => v,
        Err(_) => trimmed.replace(',', ".").parse().ok()?,
    };
    if value.is_finite() && (0.0..=MAX_RATING).contains(&value) {
        Some(value)
    } else {
        None
    }
}

/// Parse a calendar date, keeping only the date part of timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = collapse_whitespace(raw);
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace; empty results are absent
pub fn clean_text(s: &str) -> Option<String> {
    let out = collapse_whitespace(s);
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
