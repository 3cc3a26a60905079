//! The company (account) record consumed by the funnel.

use crate::types::CompanyId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One company as the funnel sees it. Either synthesized by the
/// population module or supplied by the caller. Every field except
/// `company_id` is optional in spirit: blanks and junk degrade to
/// conservative defaults at signal-extraction time instead of erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub name: String,
    pub domain: String,
    pub industry: String,
    pub country: String,
    /// Band label, normally one of the 8 known labels ("2-10" .. "10001+").
    pub size_band: String,
    pub created_date: NaiveDate,
    pub source: String,
    pub campaign: String,
    /// Free-text technology-signal field; rail flags are derived from it
    /// by case-insensitive keyword search.
    pub health_tech: String,
    pub stack_confidence: f64,
    pub is_prior_customer: bool,
    pub is_icp: bool,
    pub icp_confidence: f64,
}
