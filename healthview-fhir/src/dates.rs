use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,4}-\d{1,2}").expect("valid date prefix pattern"));

static DATE_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,4})-(\d{1,2})(?:-(\d{1,2}))?(.*)$").expect("valid date parts pattern")
});

static TIME_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[T ]\d{1,2}(?::\d{2}(?::\d{2}(?:[.,]\d+)?)?)?)?\s*(?:Z|[+-]\d{2}(?::?\d{2})?)?$")
        .expect("valid time tail pattern")
});

/// Reformat a date-like scalar to `YYYY-MM-DD`.
///
/// Only strings starting with `\d{2,4}-\d{1,2}` are considered. Anything that
/// fails to parse comes back unchanged.
pub fn normalize_date(raw: &str) -> String {
    if !DATE_PREFIX.is_match(raw) {
        return raw.to_string();
    }
    match parse_loose_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

/// Permissive parse: missing day is the first of the month, two-digit years
/// pivot at 69, a trailing time and zone are accepted and dropped.
pub(crate) fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE_PARTS.captures(raw.trim())?;
    let year_text = caps.get(1)?.as_str();
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = match caps.get(3) {
        Some(day) => day.as_str().parse().ok()?,
        None => 1,
    };
    let tail = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
    if !TIME_TAIL.is_match(tail) {
        return None;
    }

    let mut year: i32 = year_text.parse().ok()?;
    if year_text.len() == 2 {
        year += if year < 69 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
