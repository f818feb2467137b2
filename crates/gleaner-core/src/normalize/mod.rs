//! Canonicalization pass applied to extracted records before storage.
//!
//! Every function here is total and idempotent: `normalize(normalize(x))`
//! equals `normalize(x)`, except that freshly generated ids are random.

mod job;
mod resume;

pub use job::normalize_job;
pub use resume::normalize_resume;

use std::collections::HashSet;

use uuid::Uuid;

/// A record that can be brought into canonical form.
pub trait Normalize: Sized {
    fn normalize(self) -> Self;
}

/// Month names and three-letter abbreviations, lowercase.
const MONTHS: &[(&str, &str)] = &[
    ("january", "01"),
    ("february", "02"),
    ("march", "03"),
    ("april", "04"),
    ("may", "05"),
    ("june", "06"),
    ("july", "07"),
    ("august", "08"),
    ("september", "09"),
    ("october", "10"),
    ("november", "11"),
    ("december", "12"),
    ("jan", "01"),
    ("feb", "02"),
    ("mar", "03"),
    ("apr", "04"),
    ("jun", "06"),
    ("jul", "07"),
    ("aug", "08"),
    ("sep", "09"),
    ("oct", "10"),
    ("nov", "11"),
    ("dec", "12"),
];

/// Free-text proficiency synonyms mapped onto the closed proficiency scale.
const PROFICIENCY_SYNONYMS: &[(&str, &str)] = &[
    ("native", "native"),
    ("native speaker", "native"),
    ("mother tongue", "native"),
    ("bilingual", "native"),
    ("fluent", "fluent"),
    ("full professional", "fluent"),
    ("full professional proficiency", "fluent"),
    ("advanced", "advanced"),
    ("professional working", "advanced"),
    ("professional working proficiency", "advanced"),
    ("intermediate", "intermediate"),
    ("conversational", "intermediate"),
    ("limited working", "intermediate"),
    ("limited working proficiency", "intermediate"),
    ("beginner", "beginner"),
    ("elementary", "beginner"),
    ("elementary proficiency", "beginner"),
    ("basic", "beginner"),
];

/// End-date sentinels meaning "still ongoing".
const ONGOING_MARKERS: &[&str] = &["present", "current"];

/// Expiration sentinels meaning "never expires".
const NO_EXPIRATION_MARKERS: &[&str] = &["none", "no expiration", "n/a"];

/// Trim; blank becomes `None`.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Trim and lowercase an email address.
pub fn normalize_email(value: Option<String>) -> Option<String> {
    normalize_text(value).map(|v| v.to_lowercase())
}

/// Prefix `https://` unless the URL already carries an http(s) scheme.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

fn normalize_url_field(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(normalize_url)
}

fn is_year_month(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 7
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn month_number(name: &str) -> Option<&'static str> {
    let name = name.trim_end_matches(['.', ',']).to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

/// Normalize free-form date text to `YYYY-MM`.
///
/// Accepts `YYYY-MM` (unchanged), `YYYY` (becomes `YYYY-01`) and
/// `Month YYYY` / `Mon YYYY`. Anything else, including `Present`, is `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if is_year_month(s) {
        return Some(s.to_string());
    }
    if is_year(s) {
        return Some(format!("{s}-01"));
    }

    let mut parts = s.split_whitespace();
    let (month, year) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !is_year(year) {
        return None;
    }
    month_number(month).map(|mm| format!("{year}-{mm}"))
}

fn matches_marker(raw: &str, markers: &[&str]) -> bool {
    let lower = raw.trim().to_lowercase();
    markers.iter().any(|m| *m == lower)
}

/// Whether an end date marks an ongoing entry.
pub fn is_ongoing(raw: &str) -> bool {
    matches_marker(raw, ONGOING_MARKERS)
}

/// Map proficiency synonyms onto `native | fluent | advanced | intermediate |
/// beginner`. Unknown text is kept as-is (trimmed).
pub fn normalize_proficiency(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = collapse(trimmed).to_lowercase();
    let canonical = PROFICIENCY_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == lower)
        .map(|(_, level)| level.to_string());
    Some(canonical.unwrap_or_else(|| trimmed.to_string()))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim every element and drop the empty ones.
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// [`clean_list`], then drop case-insensitive duplicates keeping the first
/// occurrence.
///
/// Case is ignored so that `["Go", "go "]` collapses to `["Go"]`.
pub fn dedupe_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    clean_list(items)
        .into_iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

/// Keep a non-blank id, otherwise generate one.
pub fn ensure_id(id: Option<String>) -> Option<String> {
    normalize_text(id).or_else(|| Some(Uuid::new_v4().to_string()))
}

/// Normalized `(start, end, current)` of a date range.
///
/// An ongoing entry gets `end = Some("")`, the explicit blank marker. A
/// previously normalized ongoing entry (`current` with a blank end) stays
/// ongoing.
fn normalize_range(
    start: Option<String>,
    end: Option<String>,
    current: bool,
) -> (Option<String>, Option<String>, bool) {
    let start = start.as_deref().and_then(normalize_date);
    let raw_end = end.as_deref().map(str::trim).unwrap_or_default();
    if is_ongoing(raw_end) || (current && raw_end.is_empty()) {
        (start, Some(String::new()), true)
    } else {
        (start, normalize_date(raw_end), false)
    }
}
