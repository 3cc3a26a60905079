//! Simulation configuration: owner roster, population synthesis
//! settings, funnel tuning and billing tuning.
//!
//! Defaults carry the canonical constants; `load()` reads a JSON file
//! in which any section may be omitted and falls back to its default.
//! In tests, use `SimConfig::default_test()`.

use crate::error::{SimError, SimResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_owners")]
    pub owners: Vec<String>,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub funnel: FunnelTuning,
    #[serde(default)]
    pub billing: BillingTuning,
}

/// One acquisition source and its campaign pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMix {
    pub id: String,
    pub weight: f64,
    pub campaigns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Company creation dates are drawn uniformly from this window.
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub prior_customer_rate: f64,
    /// Independent inclusion probabilities for each rail-keyword family
    /// when composing the technology-signal field.
    pub transaction_rail_rate: f64,
    pub clinical_rail_rate: f64,
    pub clearinghouse_rate: f64,
    pub icp_base_rate: f64,
    /// Added to the ICP rate when any rail signal is present.
    pub icp_rail_bonus: f64,
    pub sources: Vec<SourceMix>,
    pub industries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelTuning {
    // Probability model
    pub jitter_sigma: f64,
    pub create_alpha: f64,
    pub create_beta: f64,
    pub win_alpha: f64,
    pub win_beta: f64,
    pub icp_create_weight: f64,
    pub icp_win_weight: f64,
    pub primary_rail_create_boost: f64,
    pub clinical_rail_create_boost: f64,
    pub primary_rail_win_boost: f64,
    pub clinical_rail_win_boost: f64,
    pub prior_customer_create_floor: f64,
    pub prior_customer_win_floor: f64,
    pub create_clamp: (f64, f64),
    pub win_clamp: (f64, f64),

    // Duration model
    pub prior_customer_duration_mult: f64,
    pub eval_rail_mult: f64,
    pub nego_primary_mult: f64,
    pub nego_clinical_mult: f64,
    pub base_scale_jitter_sigma: f64,
    pub stage_mult_jitter_sigma: f64,

    // Deal creation offset from company creation, in days (normal draw).
    pub creation_offset_mean_days: f64,
    pub creation_offset_std_days: f64,

    // Per-stage elapsed-time draws: log-normal log-space means, shared sigma.
    pub discovery_mu: f64,
    pub evaluation_mu: f64,
    pub proposal_mu: f64,
    pub negotiation_mu: f64,
    pub stage_sigma: f64,

    // Terminal close draws.
    pub win_close_mu: f64,
    pub win_close_sigma: f64,
    pub lose_close_mu: f64,
    pub lose_close_sigma: f64,
    pub prior_customer_close_mult: f64,

    // Leakage baselines, adjustments and clamps.
    pub leak_eval_alpha: f64,
    pub leak_eval_beta: f64,
    pub leak_proposal_alpha: f64,
    pub leak_proposal_beta: f64,
    pub leak_negotiation_alpha: f64,
    pub leak_negotiation_beta: f64,
    pub leak_icp_mult: f64,
    pub leak_prior_customer_mult: f64,
    pub leak_rail_mult: f64,
    pub leak_eval_clamp: (f64, f64),
    pub leak_proposal_clamp: (f64, f64),
    pub leak_negotiation_clamp: (f64, f64),

    // Lost-date offsets after the prior stage, inclusive day ranges.
    pub leak_eval_max_offset_days: i64,
    pub leak_proposal_max_offset_days: i64,
    pub leak_negotiation_max_offset_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingTuning {
    /// Beta shape for positioning the draw inside the band ARR range.
    pub position_alpha: f64,
    pub position_beta: f64,
    // Fit-score weights; the score saturates at 1.0.
    pub icp_weight: f64,
    pub rail_weight: f64,
    pub prior_customer_weight: f64,
    pub stack_weight: f64,
    /// Maximum uplift applied at fit score 1.0.
    pub uplift_max: f64,
    pub jitter_sigma: f64,
    /// Guardrails: floor at lo*low_guard, cap at hi*(1 + high_guard_max*score).
    pub low_guard: f64,
    pub high_guard_max: f64,
    /// Currency rounding quantum in whole dollars.
    pub rounding: i64,
    pub term_months: u32,
    pub start_offset_max_days: i64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            window_start: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default(),
            window_end: NaiveDate::from_ymd_opt(2025, 8, 31).unwrap_or_default(),
            prior_customer_rate: 0.08,
            transaction_rail_rate: 0.30,
            clinical_rail_rate: 0.25,
            clearinghouse_rate: 0.15,
            icp_base_rate: 0.25,
            icp_rail_bonus: 0.35,
            sources: default_sources(),
            industries: default_industries(),
        }
    }
}

impl Default for FunnelTuning {
    fn default() -> Self {
        Self {
            jitter_sigma: 0.12,
            create_alpha: 1.6,
            create_beta: 3.0,
            win_alpha: 1.5,
            win_beta: 4.0,
            icp_create_weight: 0.30,
            icp_win_weight: 0.40,
            primary_rail_create_boost: 1.20,
            clinical_rail_create_boost: 1.10,
            primary_rail_win_boost: 1.25,
            clinical_rail_win_boost: 1.10,
            prior_customer_create_floor: 0.85,
            prior_customer_win_floor: 0.70,
            create_clamp: (0.03, 0.97),
            win_clamp: (0.02, 0.98),

            prior_customer_duration_mult: 0.85,
            eval_rail_mult: 1.10,
            nego_primary_mult: 1.15,
            nego_clinical_mult: 1.05,
            base_scale_jitter_sigma: 0.08,
            stage_mult_jitter_sigma: 0.06,

            creation_offset_mean_days: 10.0,
            creation_offset_std_days: 7.0,

            discovery_mu: 1.2,
            evaluation_mu: 1.4,
            proposal_mu: 1.3,
            negotiation_mu: 1.3,
            stage_sigma: 0.6,

            win_close_mu: 1.1,
            win_close_sigma: 0.5,
            lose_close_mu: 1.2,
            lose_close_sigma: 0.6,
            prior_customer_close_mult: 0.8,

            leak_eval_alpha: 2.5,
            leak_eval_beta: 20.0,
            leak_proposal_alpha: 2.5,
            leak_proposal_beta: 18.0,
            leak_negotiation_alpha: 2.5,
            leak_negotiation_beta: 18.0,
            leak_icp_mult: 0.85,
            leak_prior_customer_mult: 0.70,
            leak_rail_mult: 0.90,
            leak_eval_clamp: (0.02, 0.25),
            leak_proposal_clamp: (0.03, 0.30),
            leak_negotiation_clamp: (0.03, 0.30),

            leak_eval_max_offset_days: 4,
            leak_proposal_max_offset_days: 6,
            leak_negotiation_max_offset_days: 9,
        }
    }
}

impl Default for BillingTuning {
    fn default() -> Self {
        Self {
            position_alpha: 2.2,
            position_beta: 2.2,
            icp_weight: 0.45,
            rail_weight: 0.35,
            prior_customer_weight: 0.15,
            stack_weight: 0.05,
            uplift_max: 0.25,
            jitter_sigma: 0.06,
            low_guard: 0.95,
            high_guard_max: 0.30,
            rounding: 100,
            term_months: 12,
            start_offset_max_days: 30,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            owners: default_owners(),
            population: PopulationConfig::default(),
            funnel: FunnelTuning::default(),
            billing: BillingTuning::default(),
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing sections keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Config with the canonical constants for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.owners.is_empty() {
            return Err(SimError::EmptyOwnerRoster);
        }
        Ok(())
    }
}

fn default_owners() -> Vec<String> {
    [
        "Marissa", "Maria", "Henry", "Isabella", "Jack", "Katherine", "Luke", "Mary", "Noah",
        "Olivia", "Peter", "Quinn", "Rachel", "Samuel", "Taylor", "William", "Zachary",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_sources() -> Vec<SourceMix> {
    let mix = |id: &str, weight: f64, campaigns: &[&str]| SourceMix {
        id: id.into(),
        weight,
        campaigns: campaigns.iter().map(|c| c.to_string()).collect(),
    };
    vec![
        mix("paid_search", 0.22, &["SEM-Brand-US", "SEM-Competitor", "SEM-NonBrand"]),
        mix("paid_social", 0.12, &["PS-LinkedIn-MM", "PS-Meta-SMB"]),
        mix("content", 0.08, &["Ebook-AI-101", "Webinar-EDI-Modern"]),
        mix("referral", 0.20, &["Customer-Referral", "Partner-Intro"]),
        mix("outbound", 0.25, &["OB-Prospecting", "OB-ABM-T1"]),
        mix("events", 0.05, &["Conf-HIMSS", "Conf-RevenueSummit"]),
        mix("direct", 0.08, &["Direct-None"]),
    ]
}

fn default_industries() -> Vec<String> {
    [
        "Healthcare Providers",
        "Health Insurance",
        "Healthcare IT",
        "Medical Billing",
        "Pharmacy Services",
        "Dental Services",
        "Behavioral Health",
        "Laboratory Services",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SimConfig::default_test().validate().is_ok());
    }

    #[test]
    fn source_weights_sum_to_one() {
        let total: f64 = SimConfig::default_test()
            .population
            .sources
            .iter()
            .map(|s| s.weight)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let cfg: SimConfig = serde_json::from_str(r#"{"owners": ["Ada"]}"#).unwrap();
        assert_eq!(cfg.owners, vec!["Ada".to_string()]);
        assert_eq!(cfg.funnel.create_alpha, 1.6);
        assert_eq!(cfg.billing.term_months, 12);
    }
}
