use anyhow::Result;
use chrono::{NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::{
    error::LedgerError,
    ledger::{from_cents, month_bounds, to_cents},
    models::BillStatus,
};

use super::{
    AppState,
    bills::{BillQuery, is_overdue, list_bills},
    ledger::financial_summary,
    units::list_units,
};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub month: String,
    pub project_id: Option<String>,
    pub total_units: usize,
    pub occupied_units: usize,
    /// Percentage of active units that are occupied.
    pub occupancy_rate: f64,
    pub bills_issued: usize,
    pub billed_total: f64,
    pub collected: f64,
    pub outstanding: f64,
    pub overdue_bills: usize,
    /// Percentage of the billed total already collected.
    pub collection_rate: f64,
    pub revenue: f64,
    pub expenses: f64,
    pub net_income: f64,
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

pub async fn dashboard_summary(
    state: &AppState,
    month: &str,
    project_id: Option<ObjectId>,
) -> Result<DashboardSummary> {
    dashboard_summary_on(state, month, project_id, Utc::now().date_naive()).await
}

/// Same as [`dashboard_summary`] with an explicit "today" for overdue checks.
pub async fn dashboard_summary_on(
    state: &AppState,
    month: &str,
    project_id: Option<ObjectId>,
    today: NaiveDate,
) -> Result<DashboardSummary> {
    let (start, end) = month_bounds(month)
        .ok_or_else(|| LedgerError::Invalid(format!("month {month} must be YYYY-MM")))?;

    let units: Vec<_> = list_units(state, project_id.as_ref())
        .await?
        .into_iter()
        .filter(|u| u.is_active)
        .collect();
    let occupied_units = units.iter().filter(|u| u.is_occupied).count();

    let bills = list_bills(
        state,
        &BillQuery {
            project_id,
            billing_month: Some(month.trim().to_string()),
            ..Default::default()
        },
    )
    .await?;
    let live: Vec<_> = bills
        .iter()
        .filter(|b| b.status != BillStatus::Cancelled)
        .collect();
    let billed: i64 = live.iter().map(|b| to_cents(b.total)).sum();
    let collected: i64 = live.iter().map(|b| to_cents(b.paid_amount)).sum();
    let outstanding: i64 = live.iter().map(|b| to_cents(b.outstanding())).sum();
    let overdue_bills = live.iter().filter(|b| is_overdue(b, today)).count();

    let summary = financial_summary(state, start, end, project_id).await?;

    Ok(DashboardSummary {
        month: month.trim().to_string(),
        project_id: project_id.map(|id| id.to_hex()),
        total_units: units.len(),
        occupied_units,
        occupancy_rate: percentage(occupied_units as i64, units.len() as i64),
        bills_issued: live.len(),
        billed_total: from_cents(billed),
        collected: from_cents(collected),
        outstanding: from_cents(outstanding),
        overdue_bills,
        collection_rate: percentage(collected, billed),
        revenue: summary.revenue.total,
        expenses: summary.expenses.total,
        net_income: summary.net_income,
    })
}
