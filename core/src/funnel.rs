//! The leakage/outcome state machine.
//!
//! States move strictly forward:
//!   created -> discovery -> evaluation -> proposal -> negotiation
//!           -> closed-won | closed-lost
//! with three leakage checkpoints after discovery. The checks run in a
//! fixed sequence (evaluation-leak, then proposal-leak, then
//! negotiation-leak) and the FIRST one that fires wins. These are
//! sequential trials, not competing hazards; reordering them would
//! change which seed produces which outcome, so the order is frozen.
//!
//! DRAW ORDER per created deal (the per-company stream contract; the
//! create/win probability draws precede this in engine.rs):
//!   1. creation offset (normal)
//!   2. duration-scale jitters (base, evaluation, negotiation)
//!   3. stage durations (discovery, evaluation, proposal, negotiation)
//!   4. leakage baselines (evaluation, proposal, negotiation)
//!   5. sequential leakage trials, stopping at the first hit
//!   6. outcome trial and the close-duration draw
//!
//! Stage dates are drawn up front and cleared when a leak fires; the
//! cleared tail is never backfilled, so a missing stage date always
//! implies every later stage date is missing too.

use crate::{
    config::FunnelTuning,
    duration::{stage_scales, StageScales},
    rng::SimRng,
    signals::FitSignals,
};
use chrono::{Duration, NaiveDate};

/// Per-checkpoint leakage probabilities for one deal.
#[derive(Debug, Clone, Copy)]
pub struct LeakageRates {
    pub evaluation: f64,
    pub proposal: f64,
    pub negotiation: f64,
}

/// Beta baselines scaled down by the fit adjustments. ICP status, a
/// prior-customer relationship and primary-rail presence each make
/// leakage less likely.
pub fn leakage_rates(signals: &FitSignals, tuning: &FunnelTuning, rng: &mut SimRng) -> LeakageRates {
    let base_eval = rng.beta(tuning.leak_eval_alpha, tuning.leak_eval_beta);
    let base_proposal = rng.beta(tuning.leak_proposal_alpha, tuning.leak_proposal_beta);
    let base_negotiation = rng.beta(tuning.leak_negotiation_alpha, tuning.leak_negotiation_beta);

    let mut adjustment = 1.0;
    if signals.is_icp {
        adjustment *= tuning.leak_icp_mult;
    }
    if signals.is_prior_customer {
        adjustment *= tuning.leak_prior_customer_mult;
    }
    if signals.has_primary_rail() {
        adjustment *= tuning.leak_rail_mult;
    }

    LeakageRates {
        evaluation: (base_eval * adjustment)
            .clamp(tuning.leak_eval_clamp.0, tuning.leak_eval_clamp.1),
        proposal: (base_proposal * adjustment)
            .clamp(tuning.leak_proposal_clamp.0, tuning.leak_proposal_clamp.1),
        negotiation: (base_negotiation * adjustment)
            .clamp(tuning.leak_negotiation_clamp.0, tuning.leak_negotiation_clamp.1),
    }
}

/// Every date of one simulated deal, fixed in a single pass.
/// Exactly one of `closed_won` / `closed_lost` is set.
#[derive(Debug, Clone, Copy)]
pub struct StageDates {
    pub created: NaiveDate,
    pub discovery: NaiveDate,
    pub evaluation: Option<NaiveDate>,
    pub proposal: Option<NaiveDate>,
    pub negotiation: Option<NaiveDate>,
    pub closed_won: Option<NaiveDate>,
    pub closed_lost: Option<NaiveDate>,
}

/// Walk one created deal through the funnel.
/// `win_probability` comes from the probability model; the create trial
/// has already succeeded by the time this runs.
pub fn simulate_stages(
    company_created: NaiveDate,
    signals: &FitSignals,
    win_probability: f64,
    tuning: &FunnelTuning,
    rng: &mut SimRng,
) -> StageDates {
    let offset = rng
        .normal(
            tuning.creation_offset_mean_days,
            tuning.creation_offset_std_days,
        )
        .round() as i64;
    let created = (company_created + Duration::days(offset)).max(company_created);

    let scales = stage_scales(signals, tuning, rng);

    let discovery = created + days(stage_days(rng, tuning.discovery_mu, tuning, scales.base));
    let evaluation = discovery
        + days(stage_days(
            rng,
            tuning.evaluation_mu,
            tuning,
            scales.base * scales.evaluation,
        ));
    let proposal = evaluation + days(stage_days(rng, tuning.proposal_mu, tuning, scales.base));
    let negotiation = proposal
        + days(stage_days(
            rng,
            tuning.negotiation_mu,
            tuning,
            scales.base * scales.negotiation,
        ));

    let leaks = leakage_rates(signals, tuning, rng);

    let mut dates = StageDates {
        created,
        discovery,
        evaluation: Some(evaluation),
        proposal: Some(proposal),
        negotiation: Some(negotiation),
        closed_won: None,
        closed_lost: None,
    };

    if rng.chance(leaks.evaluation) {
        dates.closed_lost = Some(discovery + days(rng.int_between(1, tuning.leak_eval_max_offset_days)));
        dates.evaluation = None;
        dates.proposal = None;
        dates.negotiation = None;
    } else if rng.chance(leaks.proposal) {
        dates.closed_lost =
            Some(evaluation + days(rng.int_between(1, tuning.leak_proposal_max_offset_days)));
        dates.proposal = None;
        dates.negotiation = None;
    } else if rng.chance(leaks.negotiation) {
        dates.closed_lost =
            Some(proposal + days(rng.int_between(1, tuning.leak_negotiation_max_offset_days)));
        dates.negotiation = None;
    } else if rng.chance(win_probability) {
        dates.closed_won = Some(negotiation + days(close_days_won(signals, tuning, &scales, rng)));
    } else {
        let lose = stage_days_from(rng, tuning.lose_close_mu, tuning.lose_close_sigma, scales.base);
        dates.closed_lost = Some(negotiation + days(lose));
    }

    dates
}

fn close_days_won(
    signals: &FitSignals,
    tuning: &FunnelTuning,
    scales: &StageScales,
    rng: &mut SimRng,
) -> i64 {
    let mut close = stage_days_from(rng, tuning.win_close_mu, tuning.win_close_sigma, scales.base);
    if signals.is_prior_customer {
        close = ((close as f64 * tuning.prior_customer_close_mult) as i64).max(1);
    }
    close
}

fn stage_days(rng: &mut SimRng, mu: f64, tuning: &FunnelTuning, scale: f64) -> i64 {
    stage_days_from(rng, mu, tuning.stage_sigma, scale)
}

fn stage_days_from(rng: &mut SimRng, mu: f64, sigma: f64, scale: f64) -> i64 {
    ((rng.lognormal(mu, sigma) * scale) as i64).max(1)
}

fn days(n: i64) -> Duration {
    Duration::days(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngBank;

    fn signals() -> FitSignals {
        FitSignals {
            has_transaction_rail: false,
            has_clinical_rail: false,
            has_clearinghouse: false,
            is_icp: false,
            icp_confidence: 0.0,
            is_prior_customer: false,
            stack_confidence: 0.5,
            band: None,
        }
    }

    #[test]
    fn leakage_rates_respect_clamps() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(17);
        let mut rng = bank.for_stream(crate::rng::StreamSlot::Population);
        for _ in 0..2000 {
            let rates = leakage_rates(&signals(), &tuning, &mut rng);
            assert!(rates.evaluation >= 0.02 && rates.evaluation <= 0.25);
            assert!(rates.proposal >= 0.03 && rates.proposal <= 0.30);
            assert!(rates.negotiation >= 0.03 && rates.negotiation <= 0.30);
        }
    }

    #[test]
    fn every_simulated_deal_terminates_exactly_once() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(29);
        let start = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        for i in 0..500 {
            let mut rng = bank.for_company(i);
            let d = simulate_stages(start, &signals(), 0.4, &tuning, &mut rng);
            assert_ne!(
                d.closed_won.is_some(),
                d.closed_lost.is_some(),
                "deal {i} must close exactly one way"
            );
            assert!(d.created >= start);
            assert!(d.discovery > d.created);
        }
    }

    #[test]
    fn cleared_stages_never_reappear() {
        let tuning = FunnelTuning::default();
        let bank = RngBank::new(53);
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        for i in 0..500 {
            let mut rng = bank.for_company(i);
            let d = simulate_stages(start, &signals(), 0.4, &tuning, &mut rng);
            if d.evaluation.is_none() {
                assert!(d.proposal.is_none());
                assert!(d.negotiation.is_none());
            }
            if d.proposal.is_none() {
                assert!(d.negotiation.is_none());
            }
        }
    }
}
