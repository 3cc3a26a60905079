//! funnel-runner: headless dataset generator.
//!
//! Usage:
//!   funnel-runner --seed 43 --companies 500 --db pipeline.db
//!   funnel-runner --seed 43 --companies 500 --csv-dir data/raw
//!   funnel-runner --seed 43 --config config/pipeline.json

use anyhow::Result;
use funnel_core::{
    config::SimConfig,
    engine::{RunSummary, SimEngine},
    store::SimStore,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 43u64);
    let companies = parse_arg(&args, "--companies", 500usize);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());
    let csv_dir = args
        .windows(2)
        .find(|w| w[0] == "--csv-dir")
        .map(|w| w[1].as_str());

    const KNOWN_FLAGS: [&str; 5] = ["--seed", "--companies", "--db", "--config", "--csv-dir"];
    for flag in args.iter().skip(1).filter(|a| a.starts_with("--")) {
        if !KNOWN_FLAGS.contains(&flag.as_str()) {
            log::warn!("Unknown flag: {flag}");
        }
    }

    println!("funnelforge funnel-runner");
    println!("  seed:      {seed}");
    println!("  companies: {companies}");
    println!("  db:        {db}");
    println!();

    let config = match config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", unix_now());
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let mut engine = SimEngine::new(run_id.clone(), seed, config, store)?;
    let summary = engine.run(companies)?;

    print_summary(&run_id, &summary);

    if let Some(dir) = csv_dir {
        export_csv(&engine, dir)?;
    }

    Ok(())
}

fn print_summary(run_id: &str, summary: &RunSummary) {
    let conversion = if summary.companies > 0 {
        summary.deals as f64 / summary.companies as f64 * 100.0
    } else {
        0.0
    };
    let win_rate = if summary.deals > 0 {
        summary.won as f64 / summary.deals as f64 * 100.0
    } else {
        0.0
    };

    println!("=== RUN SUMMARY ===");
    println!("  run_id:      {run_id}");
    println!("  companies:   {}", summary.companies);
    println!("  deals:       {} ({conversion:.1}% of companies)", summary.deals);
    println!("  closed won:  {} ({win_rate:.1}% of deals)", summary.won);
    println!("  closed lost: {}", summary.lost);
    println!("  total ARR:   ${}", summary.total_arr);
}

fn export_csv(engine: &SimEngine, dir: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let dir = Path::new(dir);

    let companies = engine.store.companies_in_order(&engine.run_id)?;
    write_csv(dir.join("companies.csv"), &companies)?;

    let deals = engine.store.deals_in_order(&engine.run_id)?;
    write_csv(dir.join("deals.csv"), &deals)?;

    let billing = engine.store.billing_in_order(&engine.run_id)?;
    write_csv(dir.join("billing.csv"), &billing)?;

    let unified = engine.unified_report()?;
    write_csv(dir.join("unified.csv"), &unified)?;

    println!();
    println!(
        "Wrote companies.csv ({}), deals.csv ({}), billing.csv ({}), unified.csv ({}) to {}",
        companies.len(),
        deals.len(),
        billing.len(),
        unified.len(),
        dir.display(),
    );
    Ok(())
}

fn write_csv<T: serde::Serialize>(path: std::path::PathBuf, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
