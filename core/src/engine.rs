//! The pipeline engine.
//!
//! PHASE ORDER (fixed, documented, never reordered):
//!   1. Population: synthesize or accept the company list
//!   2. Funnel:     one pass per company, in input order
//!   3. Billing:    one pass over closed-won deals, in deal order
//!
//! RULES:
//!   - All randomness flows through the RngBank. The population and
//!     billing phases each own a named stream; every company's funnel
//!     walk draws from its own sub-stream keyed by input position.
//!   - Per company the funnel stream is consumed in a fixed order:
//!     create-probability draws, win-probability draws, the create
//!     trial, deal id bytes, owner pick, then the stage walk
//!     (see funnel.rs for the rest of the contract).
//!   - Every notable outcome is appended to the event log; the
//!     determinism test compares logs byte-for-byte.

use crate::{
    billing,
    company::CompanyRecord,
    config::SimConfig,
    deal::DealRecord,
    error::{SimError, SimResult},
    event::{event_type_name, EventLogEntry, SimEvent},
    funnel, population, probability,
    report::{self, UnifiedRow},
    rng::{RngBank, StreamSlot},
    signals::FitSignals,
    store::SimStore,
    types::RunId,
};
use std::collections::HashMap;

/// End-of-run counters for summaries and quick assertions.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub companies: i64,
    pub deals: i64,
    pub won: i64,
    pub lost: i64,
    pub total_arr: i64,
}

pub struct SimEngine {
    pub run_id: RunId,
    pub seed: u64,
    pub config: SimConfig,
    pub rng_bank: RngBank,
    pub store: SimStore,
    initialized: bool,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            rng_bank: RngBank::new(seed),
            run_id,
            seed,
            config,
            store,
            initialized: false,
        })
    }

    /// Engine over an in-memory store with the canonical config.
    /// The standard entry point for tests.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "0.1.0-test")?;
        Self::new(run_id, seed, SimConfig::default_test(), store)
    }

    /// Full run from nothing but a seed: synthesize `n_companies`, walk
    /// each through the funnel, bill the wins.
    pub fn run(&mut self, n_companies: usize) -> SimResult<RunSummary> {
        self.init_run()?;
        let companies = {
            let mut rng = self.rng_bank.for_stream(StreamSlot::Population);
            population::generate(n_companies, &self.config.population, &mut rng)
        };
        self.store_population(&companies)?;
        self.simulate(&companies)
    }

    /// Full run over a caller-supplied company list (for example one
    /// loaded from a CRM extract). Records are taken in the given order.
    pub fn run_with_companies(&mut self, companies: Vec<CompanyRecord>) -> SimResult<RunSummary> {
        self.init_run()?;
        self.store_population(&companies)?;
        self.simulate(&companies)
    }

    pub fn summary(&self) -> SimResult<RunSummary> {
        Ok(RunSummary {
            companies: self.store.company_count(&self.run_id)?,
            deals: self.store.deal_count(&self.run_id)?,
            won: self.store.won_count(&self.run_id)?,
            lost: self.store.lost_count(&self.run_id)?,
            total_arr: self.store.total_arr(&self.run_id)?,
        })
    }

    /// The denormalized companies x deals x billing report.
    pub fn unified_report(&self) -> SimResult<Vec<UnifiedRow>> {
        let companies = self.store.companies_in_order(&self.run_id)?;
        let deals = self.store.deals_in_order(&self.run_id)?;
        let billing = self.store.billing_in_order(&self.run_id)?;
        Ok(report::unified_report(&companies, &deals, &billing))
    }

    fn init_run(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.append(
            "engine",
            &SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed: self.seed,
            },
        )
    }

    fn store_population(&mut self, companies: &[CompanyRecord]) -> SimResult<()> {
        for (index, company) in companies.iter().enumerate() {
            if company.company_id.is_empty() {
                return Err(SimError::MissingCompanyId { index });
            }
            self.store.insert_company(&self.run_id, company)?;
            self.append(
                "population",
                &SimEvent::CompanyGenerated {
                    company_id: company.company_id.clone(),
                    size_band: company.size_band.clone(),
                    is_prior_customer: company.is_prior_customer,
                },
            )?;
        }
        Ok(())
    }

    fn simulate(&mut self, companies: &[CompanyRecord]) -> SimResult<RunSummary> {
        self.funnel_pass(companies)?;
        self.billing_pass()?;
        let summary = self.summary()?;
        log::info!(
            "run {}: {} companies, {} deals ({} won / {} lost), ${} ARR",
            self.run_id,
            summary.companies,
            summary.deals,
            summary.won,
            summary.lost,
            summary.total_arr,
        );
        Ok(summary)
    }

    fn funnel_pass(&mut self, companies: &[CompanyRecord]) -> SimResult<()> {
        let tuning = self.config.funnel.clone();
        for (index, company) in companies.iter().enumerate() {
            let mut rng = self.rng_bank.for_company(index as u64);
            let signals = FitSignals::extract(company);

            let create = probability::create_probability(&signals, &tuning, &mut rng);
            let win = probability::win_probability(&signals, &tuning, &mut rng);

            if !rng.chance(create.value) {
                log::debug!(
                    "funnel: {} produced no deal (p={:.3})",
                    company.company_id,
                    create.value
                );
                continue;
            }

            let deal_id = rng.uuid().to_string();
            let owner_slot = rng.next_u64_below(self.config.owners.len() as u64) as usize;
            let owner = self.config.owners[owner_slot].clone();

            let dates =
                funnel::simulate_stages(company.created_date, &signals, win.value, &tuning, &mut rng);
            let deal = DealRecord::assemble(deal_id, company.company_id.clone(), owner, dates);

            self.store.insert_deal(&self.run_id, &deal)?;
            self.append(
                "funnel",
                &SimEvent::DealCreated {
                    deal_id: deal.deal_id.clone(),
                    company_id: deal.company_id.clone(),
                    owner: deal.owner.clone(),
                    create_probability: create.value,
                    win_probability: win.value,
                },
            )?;

            if let Some(closed_won_date) = deal.closed_won_date {
                self.append(
                    "funnel",
                    &SimEvent::DealWon {
                        deal_id: deal.deal_id.clone(),
                        company_id: deal.company_id.clone(),
                        closed_won_date,
                    },
                )?;
            } else if let Some(closed_lost_date) = deal.closed_lost_date {
                self.append(
                    "funnel",
                    &SimEvent::DealLost {
                        deal_id: deal.deal_id.clone(),
                        company_id: deal.company_id.clone(),
                        closed_lost_date,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn billing_pass(&mut self) -> SimResult<()> {
        let companies = self.store.companies_in_order(&self.run_id)?;
        let by_id: HashMap<&str, &CompanyRecord> = companies
            .iter()
            .map(|c| (c.company_id.as_str(), c))
            .collect();

        let deals = self.store.deals_in_order(&self.run_id)?;
        let mut rng = self.rng_bank.for_stream(StreamSlot::Billing);

        for deal in deals.iter().filter(|d| d.is_won()) {
            let Some(company) = by_id.get(deal.company_id.as_str()).copied() else {
                log::warn!(
                    "billing: deal {} references unknown company {}",
                    deal.deal_id,
                    deal.company_id
                );
                continue;
            };
            let signals = FitSignals::extract(company);
            if let Some(record) = billing::build(deal, &signals, &self.config.billing, &mut rng) {
                self.store.insert_billing(&self.run_id, &record)?;
                self.append(
                    "billing",
                    &SimEvent::BillingCreated {
                        billing_id: record.billing_id.clone(),
                        deal_id: record.deal_id.clone(),
                        arr: record.arr,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn append(&self, phase: &str, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id: None,
            run_id: self.run_id.clone(),
            phase: phase.to_string(),
            event_type: event_type_name(event).to_string(),
            payload: serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }
}
