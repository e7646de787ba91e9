use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::ApiResult,
    ledger::month_key,
    state::{AppState, DashboardSummary, dashboard_summary},
};

use super::{non_empty, parse_optional_id};

#[derive(Deserialize)]
pub struct DashboardParams {
    month: Option<String>,
    project_id: Option<String>,
}

pub async fn dashboard_show(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> ApiResult<Json<DashboardSummary>> {
    let month = non_empty(params.month).unwrap_or_else(|| month_key(Utc::now().date_naive()));
    let project_id = parse_optional_id(params.project_id.as_deref())?;
    Ok(Json(dashboard_summary(&state, &month, project_id).await?))
}
