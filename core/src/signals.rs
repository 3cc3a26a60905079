//! Fit-signal extraction.
//!
//! Pure and infallible: missing or malformed company fields degrade to
//! false flags, zero confidence, or an unknown band. Nothing here ever
//! returns an error.

use crate::{band::SizeBand, company::CompanyRecord};

/// Keywords marking transaction-standard rail support.
const TRANSACTION_RAIL_KEYWORDS: [&str; 8] =
    ["x12", "270", "271", "276", "277", "278", "835", "837"];

/// Keywords marking clinical-interop rail support.
const CLINICAL_RAIL_KEYWORDS: [&str; 2] = ["fhir", "hl7"];

/// Keywords marking a clearinghouse affiliation.
const CLEARINGHOUSE_KEYWORDS: [&str; 5] = [
    "clearinghouse",
    "availity",
    "edifecs",
    "change healthcare",
    "optum",
];

/// Derived fit features for one company.
#[derive(Debug, Clone, Copy)]
pub struct FitSignals {
    pub has_transaction_rail: bool,
    pub has_clinical_rail: bool,
    pub has_clearinghouse: bool,
    pub is_icp: bool,
    pub icp_confidence: f64,
    pub is_prior_customer: bool,
    pub stack_confidence: f64,
    pub band: Option<SizeBand>,
}

impl FitSignals {
    pub fn extract(company: &CompanyRecord) -> Self {
        let tech = company.health_tech.to_lowercase();
        Self {
            has_transaction_rail: contains_any(&tech, &TRANSACTION_RAIL_KEYWORDS),
            has_clinical_rail: contains_any(&tech, &CLINICAL_RAIL_KEYWORDS),
            has_clearinghouse: contains_any(&tech, &CLEARINGHOUSE_KEYWORDS),
            is_icp: company.is_icp,
            icp_confidence: clamp_confidence(company.icp_confidence),
            is_prior_customer: company.is_prior_customer,
            stack_confidence: clamp_confidence(company.stack_confidence),
            band: SizeBand::from_label(&company.size_band),
        }
    }

    /// Transaction-standard rail or clearinghouse; the stronger boost tier.
    pub fn has_primary_rail(&self) -> bool {
        self.has_transaction_rail || self.has_clearinghouse
    }

    /// Any rail signal at all.
    pub fn has_any_rail(&self) -> bool {
        self.has_primary_rail() || self.has_clinical_rail
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

fn clamp_confidence(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
