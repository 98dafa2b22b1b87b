use std::collections::HashSet;

use crate::model::CanonicalTender;

/// Drop later records whose identity was already seen; keeps first-seen order.
pub fn deduplicate(records: Vec<CanonicalTender>) -> Vec<CanonicalTender> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|t| seen.insert(t.tender_id.clone()))
        .collect()
}
