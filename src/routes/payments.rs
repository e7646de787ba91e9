use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    ledger::bson_to_date,
    models::{Payment, PaymentMethod},
    state::{
        AppState, PaymentQuery, get_payment_by_id, list_payments, reconcile_payment,
        record_payment, void_payment,
    },
};

use super::{created, non_empty, parse_id, parse_optional_id};

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: String,
    pub bill_id: String,
    pub project_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub is_reconciled: bool,
    pub reconciled_at: Option<NaiveDate>,
    pub bank_reference: Option<String>,
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub journal_id: Option<String>,
}

impl From<Payment> for PaymentView {
    fn from(payment: Payment) -> Self {
        PaymentView {
            id: payment.id.map(|id| id.to_hex()).unwrap_or_default(),
            bill_id: payment.bill_id.to_hex(),
            project_id: payment.project_id.to_hex(),
            amount: payment.amount,
            method: payment.method,
            payment_date: bson_to_date(payment.payment_date),
            reference: payment.reference,
            is_reconciled: payment.is_reconciled,
            reconciled_at: payment.reconciled_at.map(bson_to_date),
            bank_reference: payment.bank_reference,
            is_void: payment.is_void,
            void_reason: payment.void_reason,
            journal_id: payment.journal_id,
        }
    }
}

#[derive(Deserialize)]
pub struct PaymentFilter {
    bill_id: Option<String>,
    project_id: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    #[serde(default)]
    include_void: bool,
    #[serde(default)]
    unreconciled: bool,
}

#[derive(Deserialize)]
pub struct PaymentPayload {
    bill_id: String,
    amount: f64,
    method: String,
    payment_date: NaiveDate,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Deserialize)]
pub struct ReconcilePayload {
    bank_reference: String,
    #[serde(default)]
    reconciled_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct VoidPayload {
    reason: String,
    #[serde(default)]
    date: Option<NaiveDate>,
}

pub async fn payments_index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PaymentFilter>,
) -> ApiResult<Json<Vec<PaymentView>>> {
    let query = PaymentQuery {
        bill_id: parse_optional_id(filter.bill_id.as_deref())?,
        project_id: parse_optional_id(filter.project_id.as_deref())?,
        start: filter.start,
        end: filter.end,
        include_void: filter.include_void,
        unreconciled_only: filter.unreconciled,
    };
    let payments = list_payments(&state, &query).await?;
    Ok(Json(payments.into_iter().map(PaymentView::from).collect()))
}

pub async fn payments_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PaymentView>> {
    let id = parse_id(&id)?;
    let payment = get_payment_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("payment {id} not found")))?;
    Ok(Json(payment.into()))
}

pub async fn payments_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentPayload>,
) -> ApiResult<impl IntoResponse> {
    let bill_id = parse_id(&payload.bill_id)?;
    let method = PaymentMethod::parse(&payload.method)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown payment method {}", payload.method)))?;
    let id = record_payment(
        &state,
        &bill_id,
        payload.amount,
        method,
        payload.payment_date,
        non_empty(payload.reference),
    )
    .await?;
    Ok(created(id))
}

pub async fn payments_reconcile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReconcilePayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    reconcile_payment(&state, &id, &payload.bank_reference, payload.reconciled_on).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn payments_void(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<VoidPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    void_payment(&state, &id, &payload.reason, payload.date).await?;
    Ok(StatusCode::NO_CONTENT)
}
