//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Engine phases call store methods; they never execute SQL directly.
//! Readers return rows in insertion (rowid) order, which is the
//! simulation order downstream phases depend on.

use crate::{
    billing::BillingRecord, company::CompanyRecord, deal::DealRecord, error::SimResult,
    event::EventLogEntry,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

const DATE_FMT: &str = "%Y-%m-%d";

pub struct SimStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> SimResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_companies.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_deals.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_billing.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, 0i64],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, phase, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.phase, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, phase, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    phase: row.get(2)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Companies ──────────────────────────────────────────────

    pub fn insert_company(&self, run_id: &str, company: &CompanyRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO companies (
                run_id, company_id, name, domain, industry, country, size_band,
                created_date, source, campaign, health_tech, stack_confidence,
                is_prior_customer, is_icp, icp_confidence
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                run_id,
                company.company_id,
                company.name,
                company.domain,
                company.industry,
                company.country,
                company.size_band,
                fmt_date(company.created_date),
                company.source,
                company.campaign,
                company.health_tech,
                company.stack_confidence,
                company.is_prior_customer,
                company.is_icp,
                company.icp_confidence,
            ],
        )?;
        Ok(())
    }

    pub fn companies_in_order(&self, run_id: &str) -> SimResult<Vec<CompanyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT company_id, name, domain, industry, country, size_band,
                    created_date, source, campaign, health_tech, stack_confidence,
                    is_prior_customer, is_icp, icp_confidence
             FROM companies WHERE run_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(CompanyRecord {
                    company_id: row.get(0)?,
                    name: row.get(1)?,
                    domain: row.get(2)?,
                    industry: row.get(3)?,
                    country: row.get(4)?,
                    size_band: row.get(5)?,
                    created_date: parse_date(row.get::<_, String>(6)?)?,
                    source: row.get(7)?,
                    campaign: row.get(8)?,
                    health_tech: row.get(9)?,
                    stack_confidence: row.get(10)?,
                    is_prior_customer: row.get(11)?,
                    is_icp: row.get(12)?,
                    icp_confidence: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn company_count(&self, run_id: &str) -> SimResult<i64> {
        self.scalar("SELECT COUNT(*) FROM companies WHERE run_id = ?1", run_id)
    }

    // ── Deals ──────────────────────────────────────────────────

    pub fn insert_deal(&self, run_id: &str, deal: &DealRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO deals (
                run_id, deal_id, company_id, owner, created_date,
                stage_date_discovery, stage_date_evaluation, stage_date_proposal,
                stage_date_negotiation, closed_won_date, closed_lost_date
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                deal.deal_id,
                deal.company_id,
                deal.owner,
                fmt_date(deal.created_date),
                deal.stage_date_discovery.map(fmt_date),
                deal.stage_date_evaluation.map(fmt_date),
                deal.stage_date_proposal.map(fmt_date),
                deal.stage_date_negotiation.map(fmt_date),
                deal.closed_won_date.map(fmt_date),
                deal.closed_lost_date.map(fmt_date),
            ],
        )?;
        Ok(())
    }

    pub fn deals_in_order(&self, run_id: &str) -> SimResult<Vec<DealRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT deal_id, company_id, owner, created_date,
                    stage_date_discovery, stage_date_evaluation, stage_date_proposal,
                    stage_date_negotiation, closed_won_date, closed_lost_date
             FROM deals WHERE run_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DealRecord {
                    deal_id: row.get(0)?,
                    company_id: row.get(1)?,
                    owner: row.get(2)?,
                    created_date: parse_date(row.get::<_, String>(3)?)?,
                    stage_date_discovery: parse_opt_date(row.get(4)?)?,
                    stage_date_evaluation: parse_opt_date(row.get(5)?)?,
                    stage_date_proposal: parse_opt_date(row.get(6)?)?,
                    stage_date_negotiation: parse_opt_date(row.get(7)?)?,
                    closed_won_date: parse_opt_date(row.get(8)?)?,
                    closed_lost_date: parse_opt_date(row.get(9)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn deal_count(&self, run_id: &str) -> SimResult<i64> {
        self.scalar("SELECT COUNT(*) FROM deals WHERE run_id = ?1", run_id)
    }

    pub fn won_count(&self, run_id: &str) -> SimResult<i64> {
        self.scalar(
            "SELECT COUNT(*) FROM deals WHERE run_id = ?1 AND closed_won_date IS NOT NULL",
            run_id,
        )
    }

    pub fn lost_count(&self, run_id: &str) -> SimResult<i64> {
        self.scalar(
            "SELECT COUNT(*) FROM deals WHERE run_id = ?1 AND closed_lost_date IS NOT NULL",
            run_id,
        )
    }

    // ── Billing ────────────────────────────────────────────────

    pub fn insert_billing(&self, run_id: &str, billing: &BillingRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO billing (
                run_id, billing_id, deal_id, company_id, size_band, start_date,
                end_date, term_months, billing_frequency, arr, mrr, currency
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                run_id,
                billing.billing_id,
                billing.deal_id,
                billing.company_id,
                billing.size_band,
                fmt_date(billing.start_date),
                fmt_date(billing.end_date),
                billing.term_months,
                billing.billing_frequency,
                billing.arr,
                billing.mrr,
                billing.currency,
            ],
        )?;
        Ok(())
    }

    pub fn billing_in_order(&self, run_id: &str) -> SimResult<Vec<BillingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT billing_id, deal_id, company_id, size_band, start_date, end_date,
                    term_months, billing_frequency, arr, mrr, currency
             FROM billing WHERE run_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(BillingRecord {
                    billing_id: row.get(0)?,
                    deal_id: row.get(1)?,
                    company_id: row.get(2)?,
                    size_band: row.get(3)?,
                    start_date: parse_date(row.get::<_, String>(4)?)?,
                    end_date: parse_date(row.get::<_, String>(5)?)?,
                    term_months: row.get(6)?,
                    billing_frequency: row.get(7)?,
                    arr: row.get(8)?,
                    mrr: row.get(9)?,
                    currency: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn total_arr(&self, run_id: &str) -> SimResult<i64> {
        self.scalar(
            "SELECT COALESCE(SUM(arr), 0) FROM billing WHERE run_id = ?1",
            run_id,
        )
    }

    fn scalar(&self, sql: &str, run_id: &str) -> SimResult<i64> {
        let value = self
            .conn
            .query_row(sql, params![run_id], |row| row.get(0))?;
        Ok(value)
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(text: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&text, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_opt_date(text: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    text.map(parse_date).transpose()
}
