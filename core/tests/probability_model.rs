//! Probability-model properties: clamp intervals, floors, monotonicity.

use funnel_core::{
    band::SizeBand,
    config::FunnelTuning,
    probability::{create_probability, win_probability},
    rng::{RngBank, SimRng},
    signals::FitSignals,
};

fn random_signals(rng: &mut SimRng) -> FitSignals {
    let band_roll = rng.next_u64_below(9);
    FitSignals {
        has_transaction_rail: rng.chance(0.4),
        has_clinical_rail: rng.chance(0.4),
        has_clearinghouse: rng.chance(0.3),
        is_icp: rng.chance(0.5),
        icp_confidence: rng.next_f64(),
        is_prior_customer: rng.chance(0.3),
        stack_confidence: rng.next_f64(),
        band: if band_roll == 8 {
            None
        } else {
            Some(SizeBand::ALL[band_roll as usize])
        },
    }
}

/// Across 10,000 randomized companies, probabilities never leave their
/// documented clamp intervals.
#[test]
fn probabilities_stay_inside_clamp_intervals() {
    let tuning = FunnelTuning::default();
    let bank = RngBank::new(0xB0DA_55);
    let mut signal_rng = bank.for_stream(funnel_core::rng::StreamSlot::Population);

    for i in 0..10_000u64 {
        let signals = random_signals(&mut signal_rng);
        let mut rng = bank.for_company(i);
        let create = create_probability(&signals, &tuning, &mut rng);
        let win = win_probability(&signals, &tuning, &mut rng);

        assert!(
            (0.03..=0.97).contains(&create.value),
            "company {i}: create probability {} escaped [0.03, 0.97]",
            create.value
        );
        assert!(
            (0.02..=0.98).contains(&win.value),
            "company {i}: win probability {} escaped [0.02, 0.98]",
            win.value
        );
    }
}

/// Prior customers never score below the documented floors, whatever
/// their other signals look like.
#[test]
fn prior_customer_floors_hold() {
    let tuning = FunnelTuning::default();
    let bank = RngBank::new(77);
    let mut signal_rng = bank.for_stream(funnel_core::rng::StreamSlot::Population);

    for i in 0..2_000u64 {
        let mut signals = random_signals(&mut signal_rng);
        signals.is_prior_customer = true;
        let mut rng = bank.for_company(i);
        let create = create_probability(&signals, &tuning, &mut rng);
        let win = win_probability(&signals, &tuning, &mut rng);
        assert!(create.value >= 0.85, "create {} under floor", create.value);
        assert!(win.value >= 0.70, "win {} under floor", win.value);
    }
}

/// Two companies identical except prior-customer status: the prior
/// customer's probabilities are never lower. The same sub-stream is
/// replayed for both, so the baseline draws match exactly.
#[test]
fn prior_customer_never_scores_lower() {
    let tuning = FunnelTuning::default();
    let bank = RngBank::new(5150);
    let mut signal_rng = bank.for_stream(funnel_core::rng::StreamSlot::Population);

    for i in 0..2_000u64 {
        let mut signals = random_signals(&mut signal_rng);
        signals.is_prior_customer = false;
        let plain_create = create_probability(&signals, &tuning, &mut bank.for_company(i));

        signals.is_prior_customer = true;
        let prior_create = create_probability(&signals, &tuning, &mut bank.for_company(i));

        assert!(
            prior_create.value >= plain_create.value,
            "company {i}: prior {} < plain {}",
            prior_create.value,
            plain_create.value
        );
        assert_eq!(prior_create.baseline, plain_create.baseline);

        signals.is_prior_customer = false;
        let plain_win = win_probability(&signals, &tuning, &mut bank.for_company(i));
        signals.is_prior_customer = true;
        let prior_win = win_probability(&signals, &tuning, &mut bank.for_company(i));
        assert!(prior_win.value >= plain_win.value);
    }
}

/// A transaction-rail signal strictly raises create probability when
/// the baseline draw is held fixed and neither value sits on a clamp
/// boundary.
#[test]
fn transaction_rail_strictly_raises_create_probability() {
    let tuning = FunnelTuning::default();
    let bank = RngBank::new(8086);

    let mut base = FitSignals {
        has_transaction_rail: false,
        has_clinical_rail: false,
        has_clearinghouse: false,
        is_icp: false,
        icp_confidence: 0.0,
        is_prior_customer: false,
        stack_confidence: 0.0,
        band: Some(SizeBand::Emp51To200),
    };

    let mut strictly_greater = 0;
    let mut comparable = 0;
    for i in 0..200u64 {
        base.has_transaction_rail = false;
        let plain = create_probability(&base, &tuning, &mut bank.for_company(i));
        base.has_transaction_rail = true;
        let boosted = create_probability(&base, &tuning, &mut bank.for_company(i));

        assert_eq!(plain.baseline, boosted.baseline);
        assert_eq!(plain.jitter, boosted.jitter);
        assert!(boosted.value >= plain.value);

        // Strictness is only observable away from the clamp edges.
        if plain.value > 0.03 && boosted.value < 0.97 {
            comparable += 1;
            if boosted.value > plain.value {
                strictly_greater += 1;
            }
        }
    }
    assert!(comparable > 100, "too few clamp-free samples: {comparable}");
    assert_eq!(
        strictly_greater, comparable,
        "rail boost failed to strictly raise some clamp-free probability"
    );
}

/// The breakdown multiplies out to the reported value before flooring
/// and clamping, so each step's contribution is auditable.
#[test]
fn breakdown_factors_compose() {
    let tuning = FunnelTuning::default();
    let bank = RngBank::new(4242);
    let mut signal_rng = bank.for_stream(funnel_core::rng::StreamSlot::Population);

    for i in 0..500u64 {
        let signals = random_signals(&mut signal_rng);
        let p = win_probability(&signals, &tuning, &mut bank.for_company(i));
        let product = p.baseline * p.jitter * p.icp_boost * p.rail_boost * p.band_multiplier * p.stack_scale;
        if !p.floor_applied {
            let expected = product.clamp(0.02, 0.98);
            assert!(
                (p.value - expected).abs() < 1e-12,
                "company {i}: breakdown product {expected} != value {}",
                p.value
            );
        } else {
            assert!(product < 0.70);
            assert!(p.value >= 0.70);
        }
    }
}
