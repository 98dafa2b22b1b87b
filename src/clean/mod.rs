pub mod dates;
pub mod tender_type;
pub mod text;

use crate::error::ValidationError;
use crate::model::{Attachment, CanonicalTender, RawAttachment, TenderDetail, DEFAULT_ATTACHMENT_NAME};
use crate::validate;
use tender_type::Classification;

/// Field-by-field normalized record; still may be missing required values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTender {
    pub tender_id: Option<String>,
    pub title: Option<String>,
    pub organization: Option<String>,
    /// Canonical label produced by classification.
    pub tender_type: Option<String>,
    pub publish_date: Option<chrono::NaiveDate>,
    pub closing_date: Option<chrono::NaiveDate>,
    pub description: Option<String>,
    pub source_url: String,
    pub attachments: Vec<Attachment>,
}

/// Result of cleaning one merged record.
#[derive(Debug)]
pub struct Cleaned {
    pub tender: Result<CanonicalTender, ValidationError>,
    /// Raw type label that had to be defaulted to `Services`.
    pub defaulted_type: Option<String>,
}

pub fn normalize(detail: &TenderDetail) -> (NormalizedTender, Option<Classification>) {
    let classification = detail.tender_type.as_deref().and_then(tender_type::classify);
    let normalized = NormalizedTender {
        tender_id: text::clean_text(Some(&detail.tender_id)),
        title: text::clean_text(detail.title.as_deref()),
        organization: text::clean_text(detail.organization.as_deref()),
        tender_type: classification.map(|c| c.tender_type().to_string()),
        publish_date: dates::parse_date(detail.publish_date.as_deref()),
        closing_date: dates::parse_date(detail.closing_date.as_deref()),
        description: text::clean_description(detail.description.as_deref()),
        source_url: detail.source_url.clone(),
        attachments: normalize_attachments(&detail.attachments),
    };
    (normalized, classification)
}

/// Keep entries with a url; blank names become the placeholder.
pub fn normalize_attachments(raw: &[RawAttachment]) -> Vec<Attachment> {
    raw.iter()
        .filter_map(|a| {
            let url = a.url.as_deref()?.trim();
            if url.is_empty() {
                return None;
            }
            Some(Attachment {
                name: text::clean_text(a.name.as_deref())
                    .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string()),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Normalize then validate.
pub fn clean_tender(detail: &TenderDetail) -> Cleaned {
    let (normalized, classification) = normalize(detail);
    let defaulted_type = match classification {
        Some(Classification::Defaulted) => detail.tender_type.clone(),
        _ => None,
    };
    Cleaned {
        tender: validate::validate(normalized),
        defaulted_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenderType;

    fn raw_detail() -> TenderDetail {
        TenderDetail {
            tender_id: " 4521 ".into(),
            title: Some("  Supply of\n school   furniture ".into()),
            organization: Some("District  Education Office".into()),
            tender_type: Some("Supply".into()),
            publish_date: Some("1st March 2024".into()),
            closing_date: Some("March 30, 2024".into()),
            description: Some("Disclaimer: Desks and chairs\n\n\n for 12 schools.".into()),
            source_url: "https://tender.example/tender/4521".into(),
            attachments: vec![
                RawAttachment {
                    name: Some("  BOQ ".into()),
                    url: Some(" https://tender.example/files/boq.xlsx ".into()),
                },
                RawAttachment {
                    name: None,
                    url: Some("https://tender.example/files/nit.pdf".into()),
                },
                RawAttachment {
                    name: Some("orphan".into()),
                    url: None,
                },
                RawAttachment {
                    name: Some("blank".into()),
                    url: Some("  ".into()),
                },
            ],
        }
    }

    #[test]
    fn cleans_every_field() {
        let cleaned = clean_tender(&raw_detail());
        let t = cleaned.tender.unwrap();
        assert_eq!(t.tender_id, "4521");
        assert_eq!(t.title, "Supply of school furniture");
        assert_eq!(t.organization, "District Education Office");
        assert_eq!(t.tender_type, TenderType::Goods);
        assert_eq!(t.publish_date.to_string(), "2024-03-01");
        assert_eq!(t.closing_date.map(|d| d.to_string()).as_deref(), Some("2024-03-30"));
        assert_eq!(t.description, "Desks and chairs\n\nfor 12 schools.");
        assert_eq!(
            t.attachments,
            vec![
                Attachment {
                    name: "BOQ".into(),
                    url: "https://tender.example/files/boq.xlsx".into()
                },
                Attachment {
                    name: "Document".into(),
                    url: "https://tender.example/files/nit.pdf".into()
                },
            ]
        );
        assert!(cleaned.defaulted_type.is_none());
    }

    #[test]
    fn canonical_record_is_a_fixed_point() {
        let first = clean_tender(&raw_detail()).tender.unwrap();
        let second = clean_tender(&TenderDetail::from(&first)).tender.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_type_is_reported_not_rejected() {
        let mut detail = raw_detail();
        detail.tender_type = Some("Unknown Category XYZ".into());
        let cleaned = clean_tender(&detail);
        assert_eq!(cleaned.tender.unwrap().tender_type, TenderType::Services);
        assert_eq!(cleaned.defaulted_type.as_deref(), Some("Unknown Category XYZ"));
    }

    #[test]
    fn missing_organization_fails_validation() {
        let mut detail = raw_detail();
        detail.organization = Some("   ".into());
        let cleaned = clean_tender(&detail);
        assert_eq!(
            cleaned.tender.unwrap_err(),
            ValidationError::MissingField("organization")
        );
    }

    #[test]
    fn unparseable_closing_date_is_dropped_silently() {
        let mut detail = raw_detail();
        detail.closing_date = Some("until further notice".into());
        let t = clean_tender(&detail).tender.unwrap();
        assert_eq!(t.closing_date, None);
    }
}
