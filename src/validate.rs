use crate::clean::NormalizedTender;
use crate::error::ValidationError;
use crate::model::{CanonicalTender, TenderType};

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    required(value.filter(|v| !v.trim().is_empty()), field)
}

/// Gate a normalized record. Required: id, title, organization, type,
/// publish date, description.
pub fn validate(n: NormalizedTender) -> Result<CanonicalTender, ValidationError> {
    let tender_id = non_empty(n.tender_id, "tender_id")?;
    let title = non_empty(n.title, "title")?;
    let organization = non_empty(n.organization, "organization")?;
    let label = non_empty(n.tender_type, "tender_type")?;
    let publish_date = required(n.publish_date, "publish_date")?;
    let description = non_empty(n.description, "description")?;

    let tender_type =
        TenderType::from_label(&label).ok_or(ValidationError::InvalidTenderType(label))?;

    Ok(CanonicalTender {
        tender_id,
        title,
        organization,
        tender_type,
        publish_date,
        closing_date: n.closing_date,
        description,
        source_url: n.source_url,
        attachments: n.attachments,
    })
}
