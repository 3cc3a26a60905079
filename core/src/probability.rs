//! The layered probability model.
//!
//! Both operations share one shape: a Beta baseline draw, a log-normal
//! jitter, then a fixed-order stack of multiplicative adjustments:
//!
//!   1. ICP boost            1 + k * icp_confidence (if flagged)
//!   2. rail boost           primary/clearinghouse tier, else clinical tier
//!   3. band multiplier      win only; non-increasing across bands
//!   4. stack-confidence     0.6 + 0.4 * confidence
//!   5. prior-customer floor
//!   6. clamp to the stage's open interval
//!
//! The step order is part of the contract. Each step's contribution is
//! recorded on the returned breakdown so tests can pin them one by one.

use crate::{config::FunnelTuning, rng::SimRng, signals::FitSignals};

/// One probability with every adjustment step's factor preserved.
/// `value` is the product of the first six fields, floored and clamped.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityBreakdown {
    pub baseline: f64,
    pub jitter: f64,
    pub icp_boost: f64,
    pub rail_boost: f64,
    pub band_multiplier: f64,
    pub stack_scale: f64,
    pub floor_applied: bool,
    pub value: f64,
}

struct StageParams {
    alpha: f64,
    beta: f64,
    icp_weight: f64,
    primary_rail_boost: f64,
    clinical_rail_boost: f64,
    band_scaled: bool,
    prior_customer_floor: f64,
    clamp: (f64, f64),
}

/// Probability that this company yields a deal at all.
/// Stream cost: one Beta draw plus one jitter draw.
pub fn create_probability(
    signals: &FitSignals,
    tuning: &FunnelTuning,
    rng: &mut SimRng,
) -> ProbabilityBreakdown {
    score(
        signals,
        &StageParams {
            alpha: tuning.create_alpha,
            beta: tuning.create_beta,
            icp_weight: tuning.icp_create_weight,
            primary_rail_boost: tuning.primary_rail_create_boost,
            clinical_rail_boost: tuning.clinical_rail_create_boost,
            band_scaled: false,
            prior_customer_floor: tuning.prior_customer_create_floor,
            clamp: tuning.create_clamp,
        },
        tuning.jitter_sigma,
        rng,
    )
}

/// Probability that a deal reaching negotiation closes won.
pub fn win_probability(
    signals: &FitSignals,
    tuning: &FunnelTuning,
    rng: &mut SimRng,
) -> ProbabilityBreakdown {
    score(
        signals,
        &StageParams {
            alpha: tuning.win_alpha,
            beta: tuning.win_beta,
            icp_weight: tuning.icp_win_weight,
            primary_rail_boost: tuning.primary_rail_win_boost,
            clinical_rail_boost: tuning.clinical_rail_win_boost,
            band_scaled: true,
            prior_customer_floor: tuning.prior_customer_win_floor,
            clamp: tuning.win_clamp,
        },
        tuning.jitter_sigma,
        rng,
    )
}

fn score(
    signals: &FitSignals,
    params: &StageParams,
    jitter_sigma: f64,
    rng: &mut SimRng,
) -> ProbabilityBreakdown {
    let baseline = rng.beta(params.alpha, params.beta);
    let jitter = rng.lognormal(0.0, jitter_sigma);

    let icp_boost = if signals.is_icp {
        1.0 + params.icp_weight * signals.icp_confidence
    } else {
        1.0
    };

    let rail_boost = if signals.has_primary_rail() {
        params.primary_rail_boost
    } else if signals.has_clinical_rail {
        params.clinical_rail_boost
    } else {
        1.0
    };

    let band_multiplier = if params.band_scaled {
        signals.band.map_or(1.0, |b| b.win_multiplier())
    } else {
        1.0
    };

    let stack_scale = 0.6 + 0.4 * signals.stack_confidence;

    let raw = baseline * jitter * icp_boost * rail_boost * band_multiplier * stack_scale;

    let floor_applied = signals.is_prior_customer && raw < params.prior_customer_floor;
    let floored = if floor_applied {
        params.prior_customer_floor
    } else {
        raw
    };

    ProbabilityBreakdown {
        baseline,
        jitter,
        icp_boost,
        rail_boost,
        band_multiplier,
        stack_scale,
        floor_applied,
        value: floored.clamp(params.clamp.0, params.clamp.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{band::SizeBand, rng::RngBank};

    fn neutral_signals() -> FitSignals {
        FitSignals {
            has_transaction_rail: false,
            has_clinical_rail: false,
            has_clearinghouse: false,
            is_icp: false,
            icp_confidence: 0.0,
            is_prior_customer: false,
            stack_confidence: 0.0,
            band: None,
        }
    }

    #[test]
    fn neutral_company_has_unit_adjustments() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(11);
        let mut rng = bank.for_company(0);
        let p = create_probability(&neutral_signals(), &tuning, &mut rng);
        assert_eq!(p.icp_boost, 1.0);
        assert_eq!(p.rail_boost, 1.0);
        assert_eq!(p.band_multiplier, 1.0);
        assert_eq!(p.stack_scale, 0.6);
        assert!(!p.floor_applied);
    }

    #[test]
    fn win_uses_band_multiplier_create_does_not() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(23);
        let mut signals = neutral_signals();
        signals.band = Some(SizeBand::Emp10001Plus);

        let create = create_probability(&signals, &tuning, &mut bank.for_company(0));
        let win = win_probability(&signals, &tuning, &mut bank.for_company(0));
        assert_eq!(create.band_multiplier, 1.0);
        assert_eq!(win.band_multiplier, 0.88);
    }

    #[test]
    fn icp_boost_scales_with_confidence() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(31);
        let mut signals = neutral_signals();
        signals.is_icp = true;
        signals.icp_confidence = 0.5;
        let p = create_probability(&signals, &tuning, &mut bank.for_company(0));
        assert!((p.icp_boost - 1.15).abs() < 1e-12);
        let w = win_probability(&signals, &tuning, &mut bank.for_company(0));
        assert!((w.icp_boost - 1.20).abs() < 1e-12);
    }

    #[test]
    fn clearinghouse_takes_the_primary_tier_over_clinical() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(47);
        let mut signals = neutral_signals();
        signals.has_clinical_rail = true;
        signals.has_clearinghouse = true;
        let p = create_probability(&signals, &tuning, &mut bank.for_company(0));
        assert_eq!(p.rail_boost, tuning.primary_rail_create_boost);
    }
}
