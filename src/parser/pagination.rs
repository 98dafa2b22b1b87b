use scraper::{Html, Selector};

use super::probe::{first_attr, first_text, text_of, Probe};
use super::TenderParser;

const CURRENT: &[Probe] = &[Probe::Css(".pagination .active"), Probe::Css(".current-page")];
const NEXT: &[Probe] = &[
    Probe::Containing(".pagination a", "Next"),
    Probe::Css("a.next-page"),
    Probe::Css(r#"a[rel="next"]"#),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    /// Highest numbered page link seen, at least 1.
    pub total_pages: u32,
    pub has_next: bool,
    pub next_url: Option<String>,
}

impl TenderParser {
    pub fn pagination(&self, html: &str) -> Pagination {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let current_page = first_text(root, CURRENT)
            .and_then(|t| t.parse().ok())
            .unwrap_or(1);
        let next_url = first_attr(root, NEXT, "href").map(|href| self.resolve(&href));

        let total_pages = Selector::parse(".pagination a[href]")
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .map(text_of)
                    .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
                    .filter_map(|t| t.parse::<u32>().ok())
                    .max()
            })
            .unwrap_or(1);

        Pagination {
            current_page,
            total_pages,
            has_next: next_url.is_some(),
            next_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TenderParser {
        TenderParser::new("https://tender.example").unwrap()
    }

    #[test]
    fn reads_current_next_and_total() {
        let html = r#"
            <ul class="pagination">
              <li><a href="/?page=1">1</a></li>
              <li class="active">2</li>
              <li><a href="/?page=3">3</a></li>
              <li><a href="/?page=7">7</a></li>
              <li><a href="/?page=3">Next &rsaquo;</a></li>
            </ul>"#;
        let p = parser().pagination(html);
        assert_eq!(
            p,
            Pagination {
                current_page: 2,
                total_pages: 7,
                has_next: true,
                next_url: Some("https://tender.example/?page=3".into()),
            }
        );
    }

    #[test]
    fn rel_next_outside_pagination_block() {
        let html = r#"<span class="current-page">4</span><a rel="next" href="/?page=5">older</a>"#;
        let p = parser().pagination(html);
        assert_eq!(p.current_page, 4);
        assert!(p.has_next);
        assert_eq!(p.total_pages, 1);
    }

    #[test]
    fn defaults_when_nothing_matches() {
        let html = r#"<div class="pagination"><span class="active">last</span><a>Next</a></div>"#;
        assert_eq!(
            parser().pagination(html),
            Pagination {
                current_page: 1,
                total_pages: 1,
                has_next: false,
                next_url: None,
            }
        );
    }
}
