//! Tolerant `Date:` header parsing.
//!
//! `mail-parser` handles well-formed RFC 2822 dates. Archives collected over
//! many years also contain IMAP-style dates, named time zones and ISO
//! timestamps; those are retried here before a message is declared dateless.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

const FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const NAMED_ZONES: &[(&str, &str)] = &[
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("UT", "+0000"),
    ("CEST", "+0200"),
    ("CET", "+0100"),
];

/// Parse an email date string in RFC 2822, RFC 3339 or a common broken variant.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = strip_comment(raw.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let candidate = with_numeric_zone(&normalize_imap_date(strip_day_of_week(trimmed)));
    for fmt in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Drop a trailing `(comment)` such as `+0000 (UTC)`.
fn strip_comment(s: &str) -> &str {
    match s.find('(') {
        Some(pos) if s.ends_with(')') => s[..pos].trim_end(),
        _ => s,
    }
}

/// Strip a leading day-of-week such as `"Thu, "` or `"Thu "`.
fn strip_day_of_week(s: &str) -> &str {
    match s.split_once([',', ' ']) {
        Some((day, rest)) if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => s,
    }
}

/// `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    let mut pieces = s.splitn(3, '-');
    let (Some(day), Some(month), Some(rest)) = (pieces.next(), pieces.next(), pieces.next()) else {
        return s.to_string();
    };
    if day.len() > 2
        || !day.chars().all(|c| c.is_ascii_digit())
        || month.len() != 3
        || !month.chars().all(|c| c.is_ascii_alphabetic())
    {
        return s.to_string();
    }
    let mut title = month.to_ascii_lowercase();
    title[..1].make_ascii_uppercase();
    format!("{day} {title} {rest}")
}

/// Replace a trailing named time zone with its numeric offset.
fn with_numeric_zone(s: &str) -> String {
    for (name, offset) in NAMED_ZONES {
        if let Some(head) = s.strip_suffix(name) {
            if head.ends_with(' ') {
                return format!("{head}{offset}");
            }
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_rfc2822() {
        let dt = parse_date("Tue, 02 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-02T10:00:00+00:00");
    }

    #[test]
    fn test_trailing_comment() {
        let dt = parse_date("Tue, 02 Jan 2024 10:00:00 +0000 (UTC)").unwrap();
        assert_eq!(dt.day(), 2);
    }

    #[test]
    fn test_named_zone() {
        let dt = parse_date("Tue, 02 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-02T15:00:00+00:00");
    }

    #[test]
    fn test_imap_style() {
        let dt = parse_date("16-JUL-2025 03:01:03 +0000").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 7, 16));
    }

    #[test]
    fn test_iso() {
        assert!(parse_date("2024-01-02T10:00:00Z").is_some());
        assert!(parse_date("2024-01-02 10:00:00").is_some());
    }

    #[test]
    fn test_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date").is_none());
    }
}
