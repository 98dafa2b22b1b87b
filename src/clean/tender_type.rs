use crate::model::TenderType;

/// Keyword groups checked in priority order; first containment wins.
const KEYWORDS: &[(TenderType, &[&str])] = &[
    (TenderType::Goods, &["goods", "supply", "procurement"]),
    (TenderType::Works, &["works", "construction", "building"]),
    (TenderType::Services, &["services", "consulting", "service"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched(TenderType),
    /// Nothing recognizable; reclassified as `Services`.
    Defaulted,
}

impl Classification {
    pub fn tender_type(self) -> TenderType {
        match self {
            Classification::Matched(t) => t,
            Classification::Defaulted => TenderType::Services,
        }
    }
}

/// Classify a raw type label. Blank input is `None`.
pub fn classify(raw: &str) -> Option<Classification> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    let matched = KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(t, _)| *t)
        .or_else(|| TenderType::from_label(trimmed));

    Some(matched.map_or(Classification::Defaulted, Classification::Matched))
}
