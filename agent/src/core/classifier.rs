//! Deterministic classification of task text into a compliance domain.

use crate::core::types::Domain;

/// Keyword table in priority order. The first domain with a matching keyword wins.
const DOMAIN_KEYWORDS: &[(Domain, &[&str])] = &[
    (Domain::Healthcare, &["patient", "hipaa", "fhir", "hl7"]),
    (Domain::Fintech, &["pci", "sox", "finance", "payment", "card"]),
    (Domain::Government, &["fedramp", "fisma", "itar", "government"]),
    (Domain::Ecommerce, &["store", "cart", "checkout", "ecommerce"]),
    (Domain::Saas, &["saas", "soc2", "iso 27001"]),
];

/// Classify task text by case-insensitive substring match.
///
/// Total: returns [`Domain::General`] when nothing matches.
pub fn classify(text: &str) -> Domain {
    let lowered = text.to_lowercase();
    DOMAIN_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(domain, _)| *domain)
        .unwrap_or(Domain::General)
}
