use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)").unwrap());

/// Tried in order; the first that parses wins. Ambiguous numeric dates
/// resolve by position in this list.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%m.%d.%Y",
];

/// Parse a scraped date. Unparseable input is `None`, not an error.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    try_formats(trimmed).or_else(|| try_formats(&ORDINAL_RE.replace_all(trimmed, "${1}")))
}

fn try_formats(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(s: &str) -> Option<String> {
        parse_date(Some(s)).map(|d| d.to_string())
    }

    #[test]
    fn every_format_lands_on_the_same_day() {
        let inputs = [
            "2024-03-15",
            "15-03-2024",
            "03/15/2024",
            "15/03/2024",
            "2024/03/15",
            "15 March 2024",
            "15 Mar 2024",
            "March 15, 2024",
            "Mar 15, 2024",
            "15-Mar-2024",
            "15.03.2024",
            "  15 March 2024 ",
        ];
        for input in inputs {
            assert_eq!(iso(input).as_deref(), Some("2024-03-15"), "input {input:?}");
        }
    }

    #[test]
    fn ordinal_suffixes_are_stripped_on_retry() {
        assert_eq!(iso("15th March 2024").as_deref(), Some("2024-03-15"));
        assert_eq!(iso("March 1st, 2024").as_deref(), Some("2024-03-01"));
        assert_eq!(iso("2nd Feb 2024").as_deref(), Some("2024-02-02"));
        assert_eq!(iso("23rd August 2023").as_deref(), Some("2023-08-23"));
    }

    #[test]
    fn month_first_wins_for_ambiguous_slashes() {
        assert_eq!(iso("03/04/2024").as_deref(), Some("2024-03-04"));
        assert_eq!(iso("03-04-2024").as_deref(), Some("2024-04-03"));
    }

    #[test]
    fn garbage_is_absent() {
        assert_eq!(iso("next Tuesday"), None);
        assert_eq!(iso("31/02/2024"), None);
        assert_eq!(iso(""), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn iso_output_is_a_fixed_point() {
        let once = iso("March 15, 2024").unwrap();
        assert_eq!(iso(&once).unwrap(), once);
    }
}
