//! The denormalized unified report: companies x deals x billing.
//!
//! Pure join over the three datasets. Deals attach to companies by
//! company id (at most one deal per company), billing attaches by the
//! (company id, deal id) pair.

use crate::{billing::BillingRecord, company::CompanyRecord, deal::DealRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
    /// Kept for classification stability; this funnel closes every deal
    /// it creates, so no row currently carries it.
    Open,
    NoOpp,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Open => "open",
            Self::NoOpp => "no_opp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRow {
    // Company / enrichment
    pub company_id: String,
    pub name: String,
    pub domain: String,
    pub industry: String,
    pub country: String,
    pub size_band: String,
    pub company_created_date: NaiveDate,
    pub source: String,
    pub campaign: String,
    pub is_icp: bool,
    pub icp_confidence: f64,
    pub is_prior_customer: bool,
    pub health_tech: String,
    pub stack_confidence: f64,

    // Deal snapshot
    pub deal_id: Option<String>,
    pub owner: Option<String>,
    pub deal_created_date: Option<NaiveDate>,
    pub stage_date_discovery: Option<NaiveDate>,
    pub stage_date_evaluation: Option<NaiveDate>,
    pub stage_date_proposal: Option<NaiveDate>,
    pub stage_date_negotiation: Option<NaiveDate>,
    pub closed_won_date: Option<NaiveDate>,
    pub closed_lost_date: Option<NaiveDate>,
    pub sales_cycle_days: Option<i64>,
    pub is_opportunity: bool,
    pub is_customer: bool,
    pub outcome: Outcome,

    // Billing summary (annual)
    pub billing_id: Option<String>,
    pub billing_start_date: Option<NaiveDate>,
    pub billing_end_date: Option<NaiveDate>,
    pub term_months: Option<u32>,
    pub billing_frequency: Option<String>,
    pub arr: Option<i64>,
    pub mrr: Option<i64>,
    pub currency: Option<String>,
}

/// Assemble the report. Rows come out customers first, then other
/// opportunities, then by company creation date and deal creation date.
pub fn unified_report(
    companies: &[CompanyRecord],
    deals: &[DealRecord],
    billing: &[BillingRecord],
) -> Vec<UnifiedRow> {
    let deal_by_company: HashMap<&str, &DealRecord> =
        deals.iter().map(|d| (d.company_id.as_str(), d)).collect();
    let billing_by_deal: HashMap<(&str, &str), &BillingRecord> = billing
        .iter()
        .map(|b| ((b.company_id.as_str(), b.deal_id.as_str()), b))
        .collect();

    let mut rows: Vec<UnifiedRow> = companies
        .iter()
        .map(|company| {
            let deal = deal_by_company.get(company.company_id.as_str()).copied();
            let bill = deal.and_then(|d| {
                billing_by_deal
                    .get(&(company.company_id.as_str(), d.deal_id.as_str()))
                    .copied()
            });
            build_row(company, deal, bill)
        })
        .collect();

    rows.sort_by(|a, b| {
        b.is_customer
            .cmp(&a.is_customer)
            .then(b.is_opportunity.cmp(&a.is_opportunity))
            .then(a.company_created_date.cmp(&b.company_created_date))
            .then(a.deal_created_date.cmp(&b.deal_created_date))
    });
    rows
}

fn build_row(
    company: &CompanyRecord,
    deal: Option<&DealRecord>,
    bill: Option<&BillingRecord>,
) -> UnifiedRow {
    let is_opportunity = deal.is_some();
    let is_customer = deal.map(|d| d.is_won()).unwrap_or(false);
    let outcome = match deal {
        Some(d) if d.closed_won_date.is_some() => Outcome::Won,
        Some(d) if d.closed_lost_date.is_some() => Outcome::Lost,
        Some(_) => Outcome::Open,
        None => Outcome::NoOpp,
    };
    let sales_cycle_days = deal.map(|d| (d.latest_activity() - d.created_date).num_days());

    UnifiedRow {
        company_id: company.company_id.clone(),
        name: company.name.clone(),
        domain: company.domain.clone(),
        industry: company.industry.clone(),
        country: company.country.clone(),
        size_band: company.size_band.clone(),
        company_created_date: company.created_date,
        source: company.source.clone(),
        campaign: company.campaign.clone(),
        is_icp: company.is_icp,
        icp_confidence: company.icp_confidence,
        is_prior_customer: company.is_prior_customer,
        health_tech: company.health_tech.clone(),
        stack_confidence: company.stack_confidence,

        deal_id: deal.map(|d| d.deal_id.clone()),
        owner: deal.map(|d| d.owner.clone()),
        deal_created_date: deal.map(|d| d.created_date),
        stage_date_discovery: deal.and_then(|d| d.stage_date_discovery),
        stage_date_evaluation: deal.and_then(|d| d.stage_date_evaluation),
        stage_date_proposal: deal.and_then(|d| d.stage_date_proposal),
        stage_date_negotiation: deal.and_then(|d| d.stage_date_negotiation),
        closed_won_date: deal.and_then(|d| d.closed_won_date),
        closed_lost_date: deal.and_then(|d| d.closed_lost_date),
        sales_cycle_days,
        is_opportunity,
        is_customer,
        outcome,

        billing_id: bill.map(|b| b.billing_id.clone()),
        billing_start_date: bill.map(|b| b.start_date),
        billing_end_date: bill.map(|b| b.end_date),
        term_months: bill.map(|b| b.term_months),
        billing_frequency: bill.map(|b| b.billing_frequency.clone()),
        arr: bill.map(|b| b.arr),
        mrr: bill.map(|b| b.mrr),
        currency: bill.map(|b| b.currency.clone()),
    }
}
