use scraper::{ElementRef, Html, Selector};

use super::probe::{first_block_text, first_text, label, term, text_of, Probe};
use super::TenderParser;
use crate::error::ParseError;
use crate::model::{RawAttachment, TenderDetail};

const TITLE: &[Probe] = &[
    Probe::Css("h1.tender-title"),
    Probe::Css(".tender-detail h1"),
    Probe::Css("h1"),
    Probe::Css(".page-title h1"),
    Probe::Css("#tender-title"),
];
const ORGANIZATION: &[Probe] = &[
    Probe::Css(".organization-name"),
    Probe::Css(".agency-name"),
    Probe::Css(".procuring-entity"),
    term("Organization"),
    label("Organization"),
    Probe::Css(".tender-org"),
];
const TENDER_TYPE: &[Probe] = &[
    Probe::Css(".tender-type"),
    Probe::Css(".category"),
    term("Type"),
    term("Category"),
    Probe::Css(".tender-category"),
];
const PUBLISH_DATE: &[Probe] = &[
    Probe::Css(".publish-date"),
    Probe::Css(".date-published"),
    term("Published"),
    term("Posted"),
    Probe::Css(".tender-publish-date"),
];
const CLOSING_DATE: &[Probe] = &[
    Probe::Css(".closing-date"),
    Probe::Css(".deadline"),
    term("Closing"),
    term("Deadline"),
    Probe::Css(".tender-closing-date"),
];
const DESCRIPTION: &[Probe] = &[
    Probe::Css(".tender-description"),
    Probe::Css(".description"),
    Probe::Css("#description"),
    term("Description"),
    Probe::Css(".tender-detail-description"),
    Probe::Css(".tender-details .content"),
];

const ATTACHMENT_SECTIONS: &str = ".attachments, .documents, #attachments";
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".xls", ".xlsx"];
const MAX_LOOSE_ATTACHMENTS: usize = 10;

impl TenderParser {
    /// Full record from a detail page. A page without a title is a parse error.
    pub fn parse_detail_page(&self, html: &str, tender_id: &str) -> Result<TenderDetail, ParseError> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let title =
            first_text(root, TITLE).ok_or_else(|| ParseError::MissingTitle(tender_id.to_string()))?;

        Ok(TenderDetail {
            tender_id: tender_id.to_string(),
            title: Some(title),
            organization: first_text(root, ORGANIZATION),
            tender_type: first_text(root, TENDER_TYPE),
            publish_date: first_text(root, PUBLISH_DATE),
            closing_date: first_text(root, CLOSING_DATE),
            description: first_block_text(root, DESCRIPTION),
            source_url: String::new(),
            attachments: self.attachments(&document),
        })
    }

    /// Document links from the attachment sections, where any href mentioning
    /// a document extension counts (download endpoints carry the file name in
    /// the query). Without any section, falls back to the first few links
    /// anywhere on the page whose path ends in a document extension.
    fn attachments(&self, document: &Html) -> Vec<RawAttachment> {
        let (Ok(section_sel), Ok(links)) =
            (Selector::parse(ATTACHMENT_SECTIONS), Selector::parse("a[href]"))
        else {
            return Vec::new();
        };

        let sections: Vec<ElementRef<'_>> = document.select(&section_sel).collect();
        if sections.is_empty() {
            return document
                .select(&links)
                .filter(is_document_link)
                .take(MAX_LOOSE_ATTACHMENTS)
                .map(|a| self.attachment(a))
                .collect();
        }

        sections
            .iter()
            .flat_map(|section| section.select(&links))
            .filter(mentions_document)
            .map(|a| self.attachment(a))
            .collect()
    }

    fn attachment(&self, link: ElementRef<'_>) -> RawAttachment {
        let name = text_of(link);
        RawAttachment {
            name: (!name.is_empty()).then_some(name),
            url: link.value().attr("href").map(|href| self.resolve(href.trim())),
        }
    }
}

fn mentions_document(link: &ElementRef<'_>) -> bool {
    let Some(href) = link.value().attr("href") else {
        return false;
    };
    let href = href.to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| href.contains(ext))
}

fn is_document_link(link: &ElementRef<'_>) -> bool {
    let Some(href) = link.value().attr("href") else {
        return false;
    };
    let path = href.split(['?', '#']).next().unwrap_or_default().to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
