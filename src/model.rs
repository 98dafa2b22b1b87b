use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ATTACHMENT_NAME: &str = "Document";

/// Partial record found on a listing page, pending detail enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct TenderStub {
    pub tender_id: String,
    pub title: String,
    pub source_url: String,
    pub organization: Option<String>,
    pub publish_date: Option<String>,
    pub tender_type: Option<String>,
}

/// Raw attachment link as extracted; either side may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawAttachment {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Record found on a tender's detail page. Every field is raw text; after
/// [`TenderDetail::merge_stub`] it is the pre-normalization record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TenderDetail {
    pub tender_id: String,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub tender_type: Option<String>,
    pub publish_date: Option<String>,
    pub closing_date: Option<String>,
    pub description: Option<String>,
    pub source_url: String,
    pub attachments: Vec<RawAttachment>,
}

impl TenderDetail {
    /// Fill gaps from the listing stub. Detail values win unless missing or
    /// blank; `source_url` always comes from the stub.
    pub fn merge_stub(&mut self, stub: TenderStub) {
        fill(&mut self.title, Some(stub.title));
        fill(&mut self.organization, stub.organization);
        fill(&mut self.publish_date, stub.publish_date);
        fill(&mut self.tender_type, stub.tender_type);
        if self.tender_id.trim().is_empty() {
            self.tender_id = stub.tender_id;
        }
        self.source_url = stub.source_url;
    }
}

fn fill(slot: &mut Option<String>, fallback: Option<String>) {
    let missing = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if missing {
        if let Some(value) = fallback {
            *slot = Some(value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenderType {
    Goods,
    Works,
    Services,
}

impl TenderType {
    pub const ALL: [TenderType; 3] = [TenderType::Goods, TenderType::Works, TenderType::Services];

    pub fn as_str(self) -> &'static str {
        match self {
            TenderType::Goods => "Goods",
            TenderType::Works => "Works",
            TenderType::Services => "Services",
        }
    }

    /// Exact, case-sensitive label lookup.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl fmt::Display for TenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Normalized, validated tender. Only built by `validate::validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTender {
    pub tender_id: String,
    pub title: String,
    pub organization: String,
    pub tender_type: TenderType,
    pub publish_date: chrono::NaiveDate,
    pub closing_date: Option<chrono::NaiveDate>,
    pub description: String,
    pub source_url: String,
    pub attachments: Vec<Attachment>,
}

impl From<&CanonicalTender> for TenderDetail {
    fn from(t: &CanonicalTender) -> Self {
        TenderDetail {
            tender_id: t.tender_id.clone(),
            title: Some(t.title.clone()),
            organization: Some(t.organization.clone()),
            tender_type: Some(t.tender_type.to_string()),
            publish_date: Some(t.publish_date.format("%Y-%m-%d").to_string()),
            closing_date: t.closing_date.map(|d| d.format("%Y-%m-%d").to_string()),
            description: Some(t.description.clone()),
            source_url: t.source_url.clone(),
            attachments: t
                .attachments
                .iter()
                .map(|a| RawAttachment {
                    name: Some(a.name.clone()),
                    url: Some(a.url.clone()),
                })
                .collect(),
        }
    }
}
