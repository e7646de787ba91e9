// General ledger listing, manual adjustments, audit, and financial reports.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    ledger::{
        AccountActivity, FinancialSummary, JournalImbalance, JournalLine, TrialBalance,
        bson_to_date,
    },
    models::{LedgerEntry, ReferenceType},
    state::{
        AppState, LedgerQuery, account_ledger, audit_journals, balance_sheet, financial_summary,
        list_ledger_entries, post_manual_journal, trial_balance_for,
    },
};

use super::{non_empty, parse_optional_id};

#[derive(Debug, Serialize)]
pub struct LedgerEntryView {
    pub id: String,
    pub journal_id: String,
    pub account_code: String,
    pub debit: f64,
    pub credit: f64,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub project_id: Option<String>,
}

impl From<LedgerEntry> for LedgerEntryView {
    fn from(entry: LedgerEntry) -> Self {
        LedgerEntryView {
            id: entry.id.map(|id| id.to_hex()).unwrap_or_default(),
            journal_id: entry.journal_id,
            account_code: entry.account_code,
            debit: entry.debit,
            credit: entry.credit,
            transaction_date: bson_to_date(entry.transaction_date),
            description: entry.description,
            reference_type: entry.reference_type,
            reference_id: entry.reference_id.map(|id| id.to_hex()),
            project_id: entry.project_id.map(|id| id.to_hex()),
        }
    }
}

#[derive(Deserialize)]
pub struct LedgerFilter {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    project_id: Option<String>,
    account_code: Option<String>,
    journal_id: Option<String>,
}

/// Query string shared by the report endpoints.
#[derive(Deserialize)]
pub struct ReportParams {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    as_of: Option<NaiveDate>,
    project_id: Option<String>,
}

impl ReportParams {
    fn end_or_today(&self) -> NaiveDate {
        self.end
            .or(self.as_of)
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Deserialize)]
pub struct ManualJournalPayload {
    date: NaiveDate,
    description: String,
    #[serde(default)]
    project_id: Option<String>,
    lines: Vec<JournalLine>,
}

pub async fn ledger_index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LedgerFilter>,
) -> ApiResult<Json<Vec<LedgerEntryView>>> {
    let query = LedgerQuery {
        start: filter.start,
        end: filter.end,
        project_id: parse_optional_id(filter.project_id.as_deref())?,
        account_code: non_empty(filter.account_code),
        journal_id: non_empty(filter.journal_id),
    };
    let entries = list_ledger_entries(&state, &query).await?;
    Ok(Json(entries.into_iter().map(LedgerEntryView::from).collect()))
}

pub async fn ledger_manual_journal(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ManualJournalPayload>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_optional_id(payload.project_id.as_deref())?;
    let journal_id = post_manual_journal(
        &state,
        payload.date,
        &payload.description,
        project_id,
        payload.lines,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "journal_id": journal_id }))))
}

pub async fn ledger_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<Vec<JournalImbalance>>> {
    let report = audit_journals(&state, params.start, params.end).await?;
    Ok(Json(report))
}

/// Income statement for `[start, end]`; `start` is required.
pub async fn reports_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<FinancialSummary>> {
    let start = params
        .start
        .ok_or_else(|| ApiError::BadRequest("start date is required".into()))?;
    let end = params.end_or_today();
    let project_id = parse_optional_id(params.project_id.as_deref())?;
    Ok(Json(financial_summary(&state, start, end, project_id).await?))
}

pub async fn reports_balance_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<FinancialSummary>> {
    let project_id = parse_optional_id(params.project_id.as_deref())?;
    Ok(Json(balance_sheet(&state, params.end_or_today(), project_id).await?))
}

pub async fn reports_trial_balance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<TrialBalance>> {
    let project_id = parse_optional_id(params.project_id.as_deref())?;
    let report = trial_balance_for(&state, params.start, params.end_or_today(), project_id).await?;
    Ok(Json(report))
}

pub async fn reports_account_ledger(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<AccountActivity>> {
    let end = params.end_or_today();
    let start = params
        .start
        .unwrap_or_else(|| crate::ledger::first_day_of_month(end));
    let project_id = parse_optional_id(params.project_id.as_deref())?;
    Ok(Json(account_ledger(&state, &code, start, end, project_id).await?))
}
