//! Population synthesis tests.

use chrono::NaiveDate;
use funnel_core::{band::SizeBand, engine::SimEngine};

#[test]
fn population_generates_requested_count() {
    let mut engine = SimEngine::build_test("pop-count-test".into(), 42).unwrap();
    engine.run(200).unwrap();

    let count = engine.store.company_count("pop-count-test").unwrap();
    assert_eq!(count, 200, "Expected 200 synthesized companies, got {count}");
}

#[test]
fn every_company_has_a_known_band_and_window_date() {
    let mut engine = SimEngine::build_test("pop-shape-test".into(), 7).unwrap();
    engine.run(300).unwrap();

    let window_start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    let window_end = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();

    for company in engine.store.companies_in_order("pop-shape-test").unwrap() {
        assert!(!company.company_id.is_empty());
        assert!(
            SizeBand::from_label(&company.size_band).is_some(),
            "unknown band label: {}",
            company.size_band
        );
        assert!(company.created_date >= window_start && company.created_date <= window_end);
        assert!((0.0..=1.0).contains(&company.stack_confidence));
        assert!((0.0..=1.0).contains(&company.icp_confidence));
        assert!(!company.name.is_empty());
        assert!(company.domain.ends_with(".com"));
    }
}

#[test]
fn prior_customers_are_flagged_icp_with_high_confidence() {
    let mut engine = SimEngine::build_test("pop-prior-test".into(), 99).unwrap();
    engine.run(500).unwrap();

    let companies = engine.store.companies_in_order("pop-prior-test").unwrap();
    let priors: Vec<_> = companies.iter().filter(|c| c.is_prior_customer).collect();
    assert!(!priors.is_empty(), "no prior customers in 500 draws at ~8%");
    for company in priors {
        assert!(company.is_icp, "{} prior but not ICP", company.company_id);
        assert!(company.icp_confidence >= 0.9);
    }
}

#[test]
fn band_mix_roughly_matches_weights() {
    let mut engine = SimEngine::build_test("pop-mix-test".into(), 1234).unwrap();
    engine.run(2000).unwrap();

    let companies = engine.store.companies_in_order("pop-mix-test").unwrap();
    let small = companies
        .iter()
        .filter(|c| matches!(SizeBand::from_label(&c.size_band), Some(SizeBand::Emp2To10 | SizeBand::Emp11To50)))
        .count();
    // The two smallest bands carry half the weight; allow wide slack.
    let share = small as f64 / companies.len() as f64;
    assert!(
        (0.40..=0.60).contains(&share),
        "small-band share {share:.3} far from 0.50"
    );
}

#[test]
fn caller_supplied_companies_must_carry_identifiers() {
    let mut engine = SimEngine::build_test("pop-missing-id".into(), 3).unwrap();

    let mut engine_src = SimEngine::build_test("pop-missing-id-src".into(), 3).unwrap();
    engine_src.run(2).unwrap();
    let mut companies = engine_src
        .store
        .companies_in_order("pop-missing-id-src")
        .unwrap();
    companies[1].company_id.clear();

    let err = engine.run_with_companies(companies).unwrap_err();
    assert!(
        err.to_string().contains("position 1"),
        "unexpected error: {err}"
    );
}
