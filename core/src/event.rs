//! Run events and the persisted event log.
//!
//! Every notable outcome is appended to the event_log table in
//! processing order. Two runs with the same seed and input must produce
//! byte-identical payload sequences; the determinism test compares
//! exactly this.

use crate::types::{CompanyId, DealId, RunId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants are added over time; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    CompanyGenerated {
        company_id: CompanyId,
        size_band: String,
        is_prior_customer: bool,
    },
    DealCreated {
        deal_id: DealId,
        company_id: CompanyId,
        owner: String,
        create_probability: f64,
        win_probability: f64,
    },
    DealWon {
        deal_id: DealId,
        company_id: CompanyId,
        closed_won_date: NaiveDate,
    },
    DealLost {
        deal_id: DealId,
        company_id: CompanyId,
        closed_lost_date: NaiveDate,
    },
    BillingCreated {
        billing_id: String,
        deal_id: DealId,
        arr: i64,
    },
}

/// Extract a stable string name from a SimEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::RunInitialized { .. } => "run_initialized",
        SimEvent::CompanyGenerated { .. } => "company_generated",
        SimEvent::DealCreated { .. } => "deal_created",
        SimEvent::DealWon { .. } => "deal_won",
        SimEvent::DealLost { .. } => "deal_lost",
        SimEvent::BillingCreated { .. } => "billing_created",
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub phase: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
