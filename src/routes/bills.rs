use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    ledger::bson_to_date,
    models::{Bill, BillStatus},
    state::{AppState, BillQuery, cancel_bill, create_bill, get_bill_by_id, is_overdue, list_bills},
};

use super::{created, non_empty, parse_id, parse_optional_id};

#[derive(Debug, Serialize)]
pub struct BillView {
    pub id: String,
    pub project_id: String,
    pub unit_id: String,
    pub billing_month: String,
    pub total: f64,
    pub paid_amount: f64,
    pub outstanding: f64,
    pub status: BillStatus,
    pub is_overdue: bool,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub description: String,
    pub journal_id: Option<String>,
    pub cancelled_reason: Option<String>,
}

impl BillView {
    fn build(bill: Bill, today: NaiveDate) -> Self {
        BillView {
            id: bill.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: bill.project_id.to_hex(),
            unit_id: bill.unit_id.to_hex(),
            outstanding: bill.outstanding(),
            is_overdue: is_overdue(&bill, today),
            billing_month: bill.billing_month,
            total: bill.total,
            paid_amount: bill.paid_amount,
            status: bill.status,
            issue_date: bson_to_date(bill.issue_date),
            due_date: bill.due_date.map(bson_to_date),
            description: bill.description,
            journal_id: bill.journal_id,
            cancelled_reason: bill.cancelled_reason,
        }
    }
}

#[derive(Deserialize)]
pub struct BillFilter {
    project_id: Option<String>,
    unit_id: Option<String>,
    status: Option<String>,
    month: Option<String>,
}

#[derive(Deserialize)]
pub struct BillPayload {
    project_id: String,
    unit_id: String,
    billing_month: String,
    total: f64,
    #[serde(default)]
    issue_date: Option<NaiveDate>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelBillPayload {
    reason: String,
    #[serde(default)]
    date: Option<NaiveDate>,
}

pub async fn bills_index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BillFilter>,
) -> ApiResult<Json<Vec<BillView>>> {
    let status = match non_empty(filter.status) {
        Some(s) => Some(
            BillStatus::parse(&s)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status {s}")))?,
        ),
        None => None,
    };
    let query = BillQuery {
        project_id: parse_optional_id(filter.project_id.as_deref())?,
        unit_id: parse_optional_id(filter.unit_id.as_deref())?,
        status,
        billing_month: non_empty(filter.month),
    };

    let today = Utc::now().date_naive();
    let bills = list_bills(&state, &query).await?;
    Ok(Json(bills.into_iter().map(|b| BillView::build(b, today)).collect()))
}

pub async fn bills_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BillView>> {
    let id = parse_id(&id)?;
    let bill = get_bill_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("bill {id} not found")))?;
    Ok(Json(BillView::build(bill, Utc::now().date_naive())))
}

pub async fn bills_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BillPayload>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_id(&payload.project_id)?;
    let unit_id = parse_id(&payload.unit_id)?;
    let id = create_bill(
        &state,
        &project_id,
        &unit_id,
        &payload.billing_month,
        payload.total,
        payload.issue_date,
        payload.due_date,
        non_empty(payload.description),
    )
    .await?;
    Ok(created(id))
}

pub async fn bills_cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CancelBillPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    cancel_bill(&state, &id, &payload.reason, payload.date).await?;
    Ok(StatusCode::NO_CONTENT)
}
