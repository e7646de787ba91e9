// routes/mod.rs
// JSON API: router assembly and helpers shared by the handlers.

use std::{str::FromStr, sync::Arc};

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use mongodb::bson::oid::ObjectId;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub mod accounts;
pub mod assets;
pub mod bills;
pub mod dashboard;
pub mod ledger;
pub mod payments;
pub mod projects;
pub mod units;

pub use accounts::*;
pub use assets::*;
pub use bills::*;
pub use dashboard::*;
pub use ledger::*;
pub use payments::*;
pub use projects::*;
pub use units::*;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(projects_index).post(projects_create))
        .route(
            "/api/projects/{id}",
            get(projects_show)
                .put(projects_update)
                .delete(projects_delete),
        )
        .route("/api/projects/{id}/common-fees", post(projects_bill_common_fees))
        .route("/api/units", get(units_index).post(units_create))
        .route(
            "/api/units/{id}",
            get(units_show).put(units_update).delete(units_delete),
        )
        .route("/api/accounts", get(accounts_index).post(accounts_create))
        .route(
            "/api/accounts/{id}",
            get(accounts_show)
                .put(accounts_update)
                .delete(accounts_delete),
        )
        .route("/api/bills", get(bills_index).post(bills_create))
        .route("/api/bills/{id}", get(bills_show))
        .route("/api/bills/{id}/cancel", post(bills_cancel))
        .route("/api/payments", get(payments_index).post(payments_create))
        .route("/api/payments/{id}", get(payments_show))
        .route("/api/payments/{id}/reconcile", post(payments_reconcile))
        .route("/api/payments/{id}/void", post(payments_void))
        .route("/api/ledger", get(ledger_index))
        .route("/api/ledger/journals", post(ledger_manual_journal))
        .route("/api/ledger/audit", get(ledger_audit))
        .route("/api/reports/summary", get(reports_summary))
        .route("/api/reports/balance-sheet", get(reports_balance_sheet))
        .route("/api/reports/trial-balance", get(reports_trial_balance))
        .route("/api/reports/accounts/{code}", get(reports_account_ledger))
        .route("/api/assets", get(assets_index).post(assets_create))
        .route(
            "/api/assets/{id}",
            get(assets_show).put(assets_update).delete(assets_delete),
        )
        .route("/api/assets/depreciation", post(assets_run_depreciation))
        .route("/api/dashboard", get(dashboard_show))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn parse_id(id: &str) -> ApiResult<ObjectId> {
    ObjectId::from_str(id.trim()).map_err(|_| ApiError::BadRequest(format!("invalid id {id}")))
}

pub(crate) fn parse_optional_id(id: Option<&str>) -> ApiResult<Option<ObjectId>> {
    match id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => parse_id(id).map(Some),
        None => Ok(None),
    }
}

/// Trims and drops empty strings from optional form fields.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn created(id: ObjectId) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({ "id": id.to_hex() })))
}
