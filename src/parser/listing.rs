use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::probe::{first_attr, first_text, Probe};
use super::{extract_tender_id, TenderParser};
use crate::error::ParseError;
use crate::model::TenderStub;

/// Card boundaries; the first selector that yields any card is used.
const CARDS: &[&str] = &[".tender-card", ".tender-item", "tr.tender-row"];

const TITLE: &[Probe] = &[
    Probe::Css(".tender-title"),
    Probe::Css(".title"),
    Probe::Css("h3"),
    Probe::Css("td.title"),
];
const LINK: &[Probe] = &[
    Probe::Css(r#"a[href*="tender"]"#),
    Probe::Css(r#"a[href*="detail"]"#),
];
const ORGANIZATION: &[Probe] = &[
    Probe::Css(".organization"),
    Probe::Css(".org-name"),
    Probe::Css(".agency"),
    Probe::Css("td.organization"),
];
const PUBLISH_DATE: &[Probe] = &[
    Probe::Css(".publish-date"),
    Probe::Css(".date-published"),
    Probe::Css("td.date"),
];
const TENDER_TYPE: &[Probe] = &[
    Probe::Css(".tender-type"),
    Probe::Css(".category"),
    Probe::Css("td.type"),
];

impl TenderParser {
    /// One result per listing card, in page order.
    pub fn parse_listing_page(&self, html: &str) -> Vec<Result<TenderStub, ParseError>> {
        let document = Html::parse_document(html);
        let cards = find_cards(&document);
        if cards.is_empty() {
            debug!("No tender cards found on listing page");
        }
        cards.into_iter().map(|card| self.listing_item(card)).collect()
    }

    fn listing_item(&self, card: ElementRef<'_>) -> Result<TenderStub, ParseError> {
        let title = first_text(card, TITLE).ok_or(ParseError::CardWithoutTitle)?;
        let href = first_attr(card, LINK, "href").ok_or(ParseError::CardWithoutLink)?;
        let tender_id =
            extract_tender_id(&href).ok_or_else(|| ParseError::Unidentifiable(href.clone()))?;

        Ok(TenderStub {
            tender_id,
            title,
            source_url: self.resolve(&href),
            organization: first_text(card, ORGANIZATION),
            publish_date: first_text(card, PUBLISH_DATE),
            tender_type: first_text(card, TENDER_TYPE),
        })
    }
}

fn find_cards(document: &Html) -> Vec<ElementRef<'_>> {
    CARDS
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .map(|selector| document.select(&selector).collect::<Vec<_>>())
        .find(|cards| !cards.is_empty())
        .unwrap_or_default()
}
