//! Annual contract value for closed-won deals.
//!
//! Size is the primary driver: the draw is positioned inside the
//! band's ARR range, then nudged by a saturating fit score. Guardrails
//! keep weak fits inside the band and let strong fits run up to 30%
//! over it. Stream cost per won deal, in order: id bytes, position
//! draw, jitter draw, start-date offset.

use crate::{
    band::FALLBACK_ARR_RANGE,
    config::BillingTuning,
    deal::DealRecord,
    rng::SimRng,
    signals::FitSignals,
    types::{CompanyId, DealId},
};
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub billing_id: String,
    pub deal_id: DealId,
    pub company_id: CompanyId,
    pub size_band: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub term_months: u32,
    pub billing_frequency: String,
    pub arr: i64,
    pub mrr: i64,
    pub currency: String,
}

/// Build the billing row for one deal. Returns None unless the deal
/// closed won; lost deals never bill.
pub fn build(
    deal: &DealRecord,
    signals: &FitSignals,
    tuning: &BillingTuning,
    rng: &mut SimRng,
) -> Option<BillingRecord> {
    let closed_won = deal.closed_won_date?;

    let billing_id = rng.uuid().to_string();
    let arr = draw_arr(signals, tuning, rng);
    let mrr = round_currency(arr as f64 / 12.0, tuning.rounding);

    let start = closed_won + Duration::days(rng.int_between(0, tuning.start_offset_max_days));
    let end = start
        .checked_add_months(Months::new(tuning.term_months))
        .unwrap_or(start + Duration::days(365));

    Some(BillingRecord {
        billing_id,
        deal_id: deal.deal_id.clone(),
        company_id: deal.company_id.clone(),
        size_band: signals.band.map(|b| b.label()).unwrap_or("").into(),
        start_date: start,
        end_date: end,
        term_months: tuning.term_months,
        billing_frequency: "annual".into(),
        arr,
        mrr,
        currency: "USD".into(),
    })
}

/// Draw ARR inside the band range with a fit-based uplift.
pub fn draw_arr(signals: &FitSignals, tuning: &BillingTuning, rng: &mut SimRng) -> i64 {
    let (lo, hi) = signals.band.map_or(FALLBACK_ARR_RANGE, |b| b.arr_range());

    let position = rng.beta(tuning.position_alpha, tuning.position_beta);
    let base = lo + position * (hi - lo);

    let score = fit_score(signals, tuning);
    let uplift = (1.0 + tuning.uplift_max * score) * rng.lognormal(0.0, tuning.jitter_sigma);

    let lo_guard = lo * tuning.low_guard;
    let hi_guard = hi * (1.0 + tuning.high_guard_max * score);
    let arr = (base * uplift).clamp(lo_guard, hi_guard);

    round_currency(arr, tuning.rounding)
}

/// Saturating fit score in [0, 1].
fn fit_score(signals: &FitSignals, tuning: &BillingTuning) -> f64 {
    let rails = if signals.has_primary_rail() {
        1.0
    } else if signals.has_clinical_rail {
        0.5
    } else {
        0.0
    };

    let mut score = 0.0;
    if signals.is_icp {
        score += tuning.icp_weight * signals.icp_confidence;
    }
    score += tuning.rail_weight * rails;
    if signals.is_prior_customer {
        score += tuning.prior_customer_weight;
    }
    score += tuning.stack_weight * signals.stack_confidence;
    score.clamp(0.0, 1.0)
}

fn round_currency(x: f64, quantum: i64) -> i64 {
    let q = quantum as f64;
    ((x / q).round() * q) as i64
}
