//! Lenient date parsing for contract text
//!
//! Contract dates show up in many shapes ("March 1, 2024", "1st day of
//! March, 2024", "03/01/2024", "2024-03-01"). The parser normalizes the
//! candidate string and tries a fixed format list; the first success wins.

use chrono::NaiveDate;
use regex::Regex;

/// Formats tried in order against the normalized candidate
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",  // March 1, 2024
    "%B %d %Y",   // March 1 2024
    "%d %B %Y",   // 1 March 2024
    "%d %B, %Y",  // 1 March, 2024
    "%m/%d/%Y",   // 03/01/2024
    "%m-%d-%Y",   // 03-01-2024
    "%Y-%m-%d",   // 2024-03-01
    "%m/%d/%y",   // 03/01/24
];

/// Parse a date-shaped string, tolerating ordinal suffixes, "day of"
/// phrasing, and irregular whitespace. Returns None when no format matches.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let normalized = normalize_candidate(raw);

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return Some(date);
        }
    }

    None
}

/// Strip ordinal suffixes and legal phrasing, collapse whitespace
fn normalize_candidate(raw: &str) -> String {
    let ordinal = Regex::new(r"(\d+)(st|nd|rd|th)\b").unwrap();
    let day_of = Regex::new(r"(?i)\bday of\b").unwrap();

    let s = raw.trim().trim_end_matches(['.', ',', ';']);
    let s = ordinal.replace_all(s, "$1");
    let s = day_of.replace_all(&s, "");
    // "1 of March, 2024" -> "1 March, 2024"
    let s = Regex::new(r"(?i)\bof\b").unwrap().replace_all(&s, "");

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_long_form() {
        assert_eq!(parse_date("March 1, 2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("December 31, 2025"), Some(date(2025, 12, 31)));
    }

    #[test]
    fn test_ordinal_and_day_of() {
        assert_eq!(parse_date("1st day of March, 2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("22nd day of June, 2023"), Some(date(2023, 6, 22)));
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(parse_date("03/01/2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01"), Some(date(2024, 3, 1)));
        assert_eq!(parse_date("03-01-2024"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_trailing_punctuation() {
        assert_eq!(parse_date("March 1, 2024."), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(parse_date("the near future"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("13/45/2024"), None);
    }
}
