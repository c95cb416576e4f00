//! Static compliance control catalogs.

use crate::core::types::Domain;

/// A named compliance control with the checks an operator walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub id: &'static str,
    pub description: &'static str,
    pub validation_steps: &'static [&'static str],
}

const HIPAA_CONTROLS: &[Control] = &[
    Control {
        id: "164.312(a)(1)",
        description: "Access Control - Unique User Identification",
        validation_steps: &[
            "Verify unique user IDs in identity provider",
            "Check no shared accounts exist",
            "Validate MFA enforcement",
        ],
    },
    Control {
        id: "164.312(a)(2)(iv)",
        description: "Access Control - Encryption and Decryption",
        validation_steps: &[
            "Verify AES-256 encryption on databases",
            "Check encryption on file storage",
            "Validate key management procedures",
        ],
    },
    Control {
        id: "164.312(b)",
        description: "Audit Controls",
        validation_steps: &[
            "Verify audit logs capture all PHI access",
            "Check log retention meets 6-year requirement",
            "Validate log integrity protection",
        ],
    },
    Control {
        id: "164.312(e)(1)",
        description: "Transmission Security",
        validation_steps: &[
            "Verify TLS 1.2+ on all endpoints",
            "Check certificate validity",
            "Validate no insecure protocols",
        ],
    },
];

const FINTECH_CONTROLS: &[Control] = &[
    Control {
        id: "PCI-DSS-3.2.1",
        description: "Protect stored cardholder data",
        validation_steps: &[
            "Verify encryption at rest for cardholder data",
            "Confirm key management rotation schedule",
        ],
    },
    Control {
        id: "SOC2-CC6.1",
        description: "Logical and physical access controls",
        validation_steps: &[
            "Review access reviews and approvals",
            "Validate least-privilege roles",
        ],
    },
];

/// Controls for a domain, in catalog order. Empty when no catalog exists.
pub fn controls(domain: Domain) -> &'static [Control] {
    match domain {
        Domain::Healthcare => HIPAA_CONTROLS,
        Domain::Fintech => FINTECH_CONTROLS,
        _ => &[],
    }
}

/// Flatten a domain's catalog into ordered requirement strings.
pub fn requirements(domain: Domain) -> Vec<String> {
    controls(domain)
        .iter()
        .map(|control| format!("{} - {}", control.id, control.description))
        .collect()
}
