use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::Unit,
    state::{AppState, create_unit, delete_unit, get_unit_by_id, list_units, update_unit},
};

use super::{created, non_empty, parse_id, parse_optional_id};

#[derive(Debug, Serialize)]
pub struct UnitView {
    pub id: String,
    pub project_id: String,
    pub unit_number: String,
    pub owner_name: Option<String>,
    pub area_sqm: f64,
    pub is_occupied: bool,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl From<Unit> for UnitView {
    fn from(unit: Unit) -> Self {
        UnitView {
            id: unit.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: unit.project_id.to_hex(),
            unit_number: unit.unit_number,
            owner_name: unit.owner_name,
            area_sqm: unit.area_sqm,
            is_occupied: unit.is_occupied,
            is_active: unit.is_active,
            notes: unit.notes,
        }
    }
}

#[derive(Deserialize)]
pub struct UnitFilter {
    project_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UnitPayload {
    #[serde(default)]
    project_id: String,
    unit_number: String,
    #[serde(default)]
    owner_name: Option<String>,
    area_sqm: f64,
    #[serde(default)]
    is_occupied: bool,
    #[serde(default = "super::default_true")]
    is_active: bool,
    #[serde(default)]
    notes: Option<String>,
}

pub async fn units_index(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UnitFilter>,
) -> ApiResult<Json<Vec<UnitView>>> {
    let project_id = parse_optional_id(filter.project_id.as_deref())?;
    let units = list_units(&state, project_id.as_ref()).await?;
    Ok(Json(units.into_iter().map(UnitView::from).collect()))
}

pub async fn units_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UnitView>> {
    let id = parse_id(&id)?;
    let unit = get_unit_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("unit {id} not found")))?;
    Ok(Json(unit.into()))
}

pub async fn units_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UnitPayload>,
) -> ApiResult<impl IntoResponse> {
    let project_id = parse_id(&payload.project_id)?;
    let id = create_unit(
        &state,
        &project_id,
        &payload.unit_number,
        non_empty(payload.owner_name),
        payload.area_sqm,
        payload.is_occupied,
        non_empty(payload.notes),
    )
    .await?;
    Ok(created(id))
}

pub async fn units_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UnitPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    update_unit(
        &state,
        &id,
        &payload.unit_number,
        non_empty(payload.owner_name),
        payload.area_sqm,
        payload.is_occupied,
        payload.is_active,
        non_empty(payload.notes),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn units_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    delete_unit(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
