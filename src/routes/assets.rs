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
    ledger::{bson_to_date, monthly_depreciation, net_book_value},
    models::FixedAsset,
    state::{
        AppState, DepreciationReport, create_asset, delete_asset, get_asset_by_id, list_assets,
        run_depreciation, update_asset,
    },
};

use super::{created, non_empty, parse_id, parse_optional_id};

#[derive(Debug, Serialize)]
pub struct AssetView {
    pub id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub purchase_date: NaiveDate,
    pub purchase_cost: f64,
    pub salvage_value: f64,
    pub lifespan_months: i32,
    pub monthly_depreciation: f64,
    pub accumulated_depreciation: f64,
    pub net_book_value: f64,
    pub last_depreciation_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl From<FixedAsset> for AssetView {
    fn from(asset: FixedAsset) -> Self {
        AssetView {
            id: asset.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: asset.project_id.map(|id| id.to_hex()),
            monthly_depreciation: monthly_depreciation(
                asset.purchase_cost,
                asset.salvage_value,
                asset.lifespan_months,
            ),
            net_book_value: net_book_value(&asset),
            purchase_date: bson_to_date(asset.purchase_date),
            last_depreciation_date: asset.last_depreciation_date.map(bson_to_date),
            name: asset.name,
            purchase_cost: asset.purchase_cost,
            salvage_value: asset.salvage_value,
            lifespan_months: asset.lifespan_months,
            accumulated_depreciation: asset.accumulated_depreciation,
            is_active: asset.is_active,
            notes: asset.notes,
        }
    }
}

#[derive(Deserialize)]
pub struct AssetFilter {
    project_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AssetPayload {
    #[serde(default)]
    project_id: Option<String>,
    name: String,
    purchase_date: NaiveDate,
    purchase_cost: f64,
    #[serde(default)]
    salvage_value: f64,
    lifespan_months: i32,
    #[serde(default)]
    expense_account_code: Option<String>,
    #[serde(default)]
    accumulated_account_code: Option<String>,
    #[serde(default = "super::default_true")]
    is_active: bool,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct DepreciationRunPayload {
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

pub async fn assets_index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AssetFilter>,
) -> ApiResult<Json<Vec<AssetView>>> {
    let project_id = parse_optional_id(filter.project_id.as_deref())?;
    let assets = list_assets(&state, project_id.as_ref()).await?;
    Ok(Json(assets.into_iter().map(AssetView::from).collect()))
}

pub async fn assets_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AssetView>> {
    let id = parse_id(&id)?;
    let asset = get_asset_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("asset {id} not found")))?;
    Ok(Json(asset.into()))
}

pub async fn assets_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssetPayload>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_optional_id(payload.project_id.as_deref())?;
    let id = create_asset(
        &state,
        project_id,
        &payload.name,
        payload.purchase_date,
        payload.purchase_cost,
        payload.salvage_value,
        payload.lifespan_months,
        non_empty(payload.expense_account_code),
        non_empty(payload.accumulated_account_code),
        non_empty(payload.notes),
    )
    .await?;
    Ok(created(id))
}

pub async fn assets_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AssetPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    update_asset(
        &state,
        &id,
        &payload.name,
        payload.purchase_cost,
        payload.salvage_value,
        payload.lifespan_months,
        payload.is_active,
        non_empty(payload.notes),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assets_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    delete_asset(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs the monthly depreciation batch up to `as_of` (today when omitted).
pub async fn assets_run_depreciation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DepreciationRunPayload>,
) -> ApiResult<Json<DepreciationReport>> {
    let as_of = payload.as_of.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(run_depreciation(&state, as_of).await?))
}
