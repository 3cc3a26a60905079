//! Stage-duration scale factors.
//!
//! Three scales stretch or compress the per-stage elapsed-time draws:
//! a base scale from the band duration table (reduced for prior
//! customers, whose cycles run shorter), an evaluation multiplier
//! (boosted when any rail signal is present) and a negotiation
//! multiplier (largest for the primary tier). Each receives its own
//! log-normal jitter, drawn in this fixed order: base, evaluation,
//! negotiation.

use crate::{config::FunnelTuning, rng::SimRng, signals::FitSignals};

#[derive(Debug, Clone, Copy)]
pub struct StageScales {
    pub base: f64,
    pub evaluation: f64,
    pub negotiation: f64,
}

pub fn stage_scales(signals: &FitSignals, tuning: &FunnelTuning, rng: &mut SimRng) -> StageScales {
    let mut base = signals.band.map_or(1.0, |b| b.duration_scale());
    if signals.is_prior_customer {
        base *= tuning.prior_customer_duration_mult;
    }

    let evaluation = if signals.has_any_rail() {
        tuning.eval_rail_mult
    } else {
        1.0
    };

    let negotiation = if signals.has_primary_rail() {
        tuning.nego_primary_mult
    } else if signals.has_clinical_rail {
        tuning.nego_clinical_mult
    } else {
        1.0
    };

    StageScales {
        base: base * rng.lognormal(0.0, tuning.base_scale_jitter_sigma),
        evaluation: evaluation * rng.lognormal(0.0, tuning.stage_mult_jitter_sigma),
        negotiation: negotiation * rng.lognormal(0.0, tuning.stage_mult_jitter_sigma),
    }
}
