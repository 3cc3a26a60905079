//! The immutable deal record and its assembler.

use crate::{
    funnel::StageDates,
    types::{CompanyId, DealId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One fully determined deal. All dates are fixed at assembly time;
/// nothing mutates a deal after it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealRecord {
    pub deal_id: DealId,
    pub company_id: CompanyId,
    pub owner: String,
    pub created_date: NaiveDate,
    pub stage_date_discovery: Option<NaiveDate>,
    pub stage_date_evaluation: Option<NaiveDate>,
    pub stage_date_proposal: Option<NaiveDate>,
    pub stage_date_negotiation: Option<NaiveDate>,
    pub closed_won_date: Option<NaiveDate>,
    pub closed_lost_date: Option<NaiveDate>,
}

impl DealRecord {
    pub fn assemble(
        deal_id: DealId,
        company_id: CompanyId,
        owner: String,
        dates: StageDates,
    ) -> Self {
        Self {
            deal_id,
            company_id,
            owner,
            created_date: dates.created,
            stage_date_discovery: Some(dates.discovery),
            stage_date_evaluation: dates.evaluation,
            stage_date_proposal: dates.proposal,
            stage_date_negotiation: dates.negotiation,
            closed_won_date: dates.closed_won,
            closed_lost_date: dates.closed_lost,
        }
    }

    pub fn is_won(&self) -> bool {
        self.closed_won_date.is_some()
    }

    /// Stage dates in funnel order, terminal dates last. Used by the
    /// report's sales-cycle computation and by the invariant tests.
    pub fn dates_in_funnel_order(&self) -> [Option<NaiveDate>; 6] {
        [
            self.stage_date_discovery,
            self.stage_date_evaluation,
            self.stage_date_proposal,
            self.stage_date_negotiation,
            self.closed_won_date,
            self.closed_lost_date,
        ]
    }

    /// The latest date present on the record.
    pub fn latest_activity(&self) -> NaiveDate {
        self.dates_in_funnel_order()
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(self.created_date)
    }
}
