pub mod detail;
pub mod listing;
pub mod pagination;
pub mod probe;

use url::Url;

/// Extracts stubs, detail records and pagination from tender portal HTML.
/// Relative links are resolved against `base_url`.
pub struct TenderParser {
    base_url: Url,
}

impl TenderParser {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn resolve(&self, href: &str) -> String {
        self.base_url
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string())
    }
}

/// Tender identity from a detail URL. Segments are scanned from the end:
/// an all-digit segment is returned as is; a segment with any digit is
/// returned with everything but alphanumerics and `-` removed.
pub fn extract_tender_id(url: &str) -> Option<String> {
    for part in url.split('/').rev().filter(|p| !p.is_empty()) {
        if part.chars().all(|c| c.is_ascii_digit()) {
            return Some(part.to_string());
        }
        if part.chars().any(|c| c.is_ascii_digit()) {
            let cleaned: String = part
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .collect();
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segment_wins() {
        assert_eq!(extract_tender_id("/tender/view/123456").as_deref(), Some("123456"));
        assert_eq!(extract_tender_id("https://tender.example/tender/42/").as_deref(), Some("42"));
    }

    #[test]
    fn digit_bearing_segment_is_cleaned() {
        assert_eq!(
            extract_tender_id("/tender/GWSSB_2024.17").as_deref(),
            Some("GWSSB202417")
        );
        assert_eq!(
            extract_tender_id("/tender-detail/nit-2024-05?lang=en").as_deref(),
            Some("nit-2024-05langen")
        );
    }

    #[test]
    fn scan_stops_at_the_last_qualifying_segment() {
        // The trailing segment carries a digit, so the earlier pure number is never reached.
        assert_eq!(extract_tender_id("/tender/2024/ref-9").as_deref(), Some("ref-9"));
    }

    #[test]
    fn no_digits_means_no_identity() {
        assert_eq!(extract_tender_id("/tender/view/latest"), None);
        assert_eq!(extract_tender_id(""), None);
    }

    #[test]
    fn resolves_relative_links() {
        let p = TenderParser::new("https://tender.example").unwrap();
        assert_eq!(p.resolve("/tender/7"), "https://tender.example/tender/7");
        assert_eq!(p.resolve("https://cdn.example/a.pdf"), "https://cdn.example/a.pdf");
    }
}
