//! Deterministic company population synthesis.
//!
//! Replaces the external CRM extract + enrichment feed with a
//! self-contained generator so a run works end-to-end from nothing but
//! a seed. All draws come from the single `Population` stream, consumed
//! per company in a fixed order: id bytes, name parts, industry, band,
//! creation date, source, campaign, prior-customer flag, technology
//! signal composition, stack confidence, ICP flag, ICP confidence.
//! Changing that order changes every synthesized company downstream.

use crate::{
    band::SizeBand,
    company::CompanyRecord,
    config::{PopulationConfig, SourceMix},
    rng::SimRng,
};
use chrono::Duration;

pub fn generate(n: usize, config: &PopulationConfig, rng: &mut SimRng) -> Vec<CompanyRecord> {
    let mut companies = Vec::with_capacity(n);
    for _ in 0..n {
        companies.push(generate_one(config, rng));
    }
    log::info!("population: synthesized {n} companies");
    companies
}

fn generate_one(config: &PopulationConfig, rng: &mut SimRng) -> CompanyRecord {
    let company_id = rng.uuid().to_string();
    let name = CompanyNameGenerator::generate(rng);
    let domain = domain_for(&name);
    let industry = pick(&config.industries, rng).cloned().unwrap_or_default();

    let band = pick_band(rng);

    let window_days = (config.window_end - config.window_start).num_days().max(0);
    let created_date =
        config.window_start + Duration::days(rng.next_u64_below(window_days as u64 + 1) as i64);

    let source = pick_source(&config.sources, rng);
    let (source_id, campaign) = match source {
        Some(s) => (
            s.id.clone(),
            pick(&s.campaigns, rng).cloned().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    let is_prior_customer = rng.chance(config.prior_customer_rate);
    let health_tech = compose_health_tech(config, rng);

    let stack_confidence = rng.beta(2.0, 2.0);

    let has_rail = !health_tech.is_empty();
    let icp_rate = config.icp_base_rate + if has_rail { config.icp_rail_bonus } else { 0.0 };
    let is_icp = is_prior_customer || rng.chance(icp_rate);
    let mut icp_confidence = if is_icp {
        0.55 + 0.40 * rng.next_f64()
    } else {
        0.05 + 0.40 * rng.next_f64()
    };
    if is_prior_customer {
        icp_confidence = icp_confidence.max(0.9);
    }

    CompanyRecord {
        company_id,
        name,
        domain,
        industry,
        country: "US".into(),
        size_band: band.label().into(),
        created_date,
        source: source_id,
        campaign,
        health_tech,
        stack_confidence,
        is_prior_customer,
        is_icp,
        icp_confidence,
    }
}

/// Cumulative-weight pick over the 8 bands.
fn pick_band(rng: &mut SimRng) -> SizeBand {
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for band in SizeBand::ALL {
        cumulative += band.population_weight();
        if roll < cumulative {
            return band;
        }
    }
    SizeBand::Emp10001Plus
}

fn pick_source<'a>(sources: &'a [SourceMix], rng: &mut SimRng) -> Option<&'a SourceMix> {
    if sources.is_empty() {
        // Still consume the roll so the stream shape is stable.
        let _ = rng.next_f64();
        return None;
    }
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for source in sources {
        cumulative += source.weight;
        if roll < cumulative {
            return Some(source);
        }
    }
    sources.last()
}

fn pick<'a, T>(items: &'a [T], rng: &mut SimRng) -> Option<&'a T> {
    if items.is_empty() {
        let _ = rng.next_u64();
        return None;
    }
    Some(&items[rng.next_u64_below(items.len() as u64) as usize])
}

/// Compose the free-text technology-signal field the way enriched CRM
/// data looks: pipe-joined keyword phrases, possibly empty. Inclusion
/// of each family is an independent trial so rails co-occur.
fn compose_health_tech(config: &PopulationConfig, rng: &mut SimRng) -> String {
    const TRANSACTION_PHRASES: [&str; 4] = [
        "X12 EDI",
        "837 claims submission",
        "835 remittance",
        "270/271 eligibility",
    ];
    const CLINICAL_PHRASES: [&str; 3] = ["FHIR APIs", "HL7 v2 interfaces", "FHIR R4"];
    const CLEARINGHOUSE_PHRASES: [&str; 3] = [
        "Availity clearinghouse",
        "Change Healthcare integration",
        "Optum network",
    ];

    let mut parts: Vec<&str> = Vec::new();
    if rng.chance(config.transaction_rail_rate) {
        if let Some(p) = pick(&TRANSACTION_PHRASES, rng).copied() {
            parts.push(p);
        }
    }
    if rng.chance(config.clinical_rail_rate) {
        if let Some(p) = pick(&CLINICAL_PHRASES, rng).copied() {
            parts.push(p);
        }
    }
    if rng.chance(config.clearinghouse_rate) {
        if let Some(p) = pick(&CLEARINGHOUSE_PHRASES, rng).copied() {
            parts.push(p);
        }
    }
    parts.join("|")
}

fn domain_for(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect();
    format!("{slug}.com")
}

/// Deterministic company name generation using curated word lists.
pub struct CompanyNameGenerator;

impl CompanyNameGenerator {
    pub fn generate(rng: &mut SimRng) -> String {
        let prefixes = Self::prefixes();
        let fields = Self::practice_fields();
        let suffixes = Self::suffixes();

        let field = fields[rng.next_u64_below(fields.len() as u64) as usize];
        let suffix = suffixes[rng.next_u64_below(suffixes.len() as u64) as usize];

        // Two shapes: "Prefix Field Suffix" or "Field Suffix of Region".
        if rng.chance(0.7) {
            let prefix = prefixes[rng.next_u64_below(prefixes.len() as u64) as usize];
            format!("{prefix} {field} {suffix}")
        } else {
            let regions = Self::regions();
            let region = regions[rng.next_u64_below(regions.len() as u64) as usize];
            format!("{field} {suffix} of {region}")
        }
    }

    fn prefixes() -> &'static [&'static str] {
        &[
            "Apex", "Summit", "Cascade", "Harbor", "Beacon", "Lakeside", "Northstar", "Granite",
            "Silver Oak", "Bluebird", "Meridian", "Pinnacle", "Clearwater", "Crescent", "Ironwood",
            "Redwood", "Frontier", "Keystone", "Horizon", "Evergreen",
        ]
    }

    fn practice_fields() -> &'static [&'static str] {
        &[
            "Health", "Care", "Medical", "Clinical", "Benefits", "Claims", "Wellness", "Therapy",
            "Diagnostics", "Billing", "Revenue", "Pharmacy", "Dental", "Imaging",
        ]
    }

    fn suffixes() -> &'static [&'static str] {
        &[
            "Group", "Partners", "Systems", "Solutions", "Associates", "Network", "Alliance",
            "Services", "Labs", "Technologies", "Collective",
        ]
    }

    fn regions() -> &'static [&'static str] {
        &[
            "Texas", "Ohio", "Georgia", "Colorado", "Oregon", "Carolina", "New England",
            "the Midwest", "the Rockies", "the Gulf Coast",
        ]
    }
}
