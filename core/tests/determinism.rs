//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Two engines, same seed, same company count.
//! They must produce byte-identical event logs.
//! Any divergence is a blocker; do not merge until fixed.

use funnel_core::engine::SimEngine;

fn run_engine(run_id: &str, seed: u64, companies: usize) -> SimEngine {
    let mut engine = SimEngine::build_test(run_id.into(), seed).expect("engine");
    engine.run(companies).expect("run");
    engine
}

fn collect_event_log(engine: &SimEngine) -> Vec<String> {
    engine
        .store
        .events_for_run(&engine.run_id)
        .expect("read events")
        .into_iter()
        .map(|e| e.payload)
        .collect()
}

#[test]
fn same_seed_produces_identical_event_logs() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    let engine_a = run_engine("det-test-a", SEED, 300);
    let engine_b = run_engine("det-test-b", SEED, 300);

    let log_a = collect_event_log(&engine_a);
    let log_b = collect_event_log(&engine_b);

    assert_eq!(
        log_a.len(),
        log_b.len(),
        "Event log lengths differ: {} vs {}",
        log_a.len(),
        log_b.len()
    );

    for (i, (a, b)) in log_a.iter().zip(log_b.iter()).enumerate() {
        // The run_id appears inside RunInitialized; skip that one entry.
        if i == 0 {
            continue;
        }
        assert_eq!(a, b, "Event log diverged at entry {i}:\n  A: {a}\n  B: {b}");
    }
}

#[test]
fn different_seeds_produce_different_logs() {
    let engine_a = run_engine("det-test-42", 42, 100);
    let engine_b = run_engine("det-test-99", 99, 100);

    let log_a = collect_event_log(&engine_a);
    let log_b = collect_event_log(&engine_b);

    // With different seeds the synthesized populations diverge; verify
    // that seed differences are actually observable.
    let any_different = log_a.len() != log_b.len()
        || log_a
            .iter()
            .zip(log_b.iter())
            .skip(1)
            .any(|(a, b)| a != b);
    assert!(
        any_different,
        "Different seeds produced identical logs; seed is not being used"
    );
}

#[test]
fn deal_records_replay_identically() {
    const SEED: u64 = 0xC4E5_F1CA;

    let engine_a = run_engine("det-deals-a", SEED, 200);
    let engine_b = run_engine("det-deals-b", SEED, 200);

    let deals_a = engine_a.store.deals_in_order(&engine_a.run_id).unwrap();
    let deals_b = engine_b.store.deals_in_order(&engine_b.run_id).unwrap();

    assert_eq!(deals_a.len(), deals_b.len());
    for (a, b) in deals_a.iter().zip(deals_b.iter()) {
        assert_eq!(a.deal_id, b.deal_id);
        assert_eq!(a.owner, b.owner);
        assert_eq!(a.created_date, b.created_date);
        assert_eq!(a.closed_won_date, b.closed_won_date);
        assert_eq!(a.closed_lost_date, b.closed_lost_date);
    }

    let arr_a = engine_a.store.total_arr(&engine_a.run_id).unwrap();
    let arr_b = engine_b.store.total_arr(&engine_b.run_id).unwrap();
    assert_eq!(arr_a, arr_b, "ARR diverged: {arr_a} vs {arr_b}");
}
