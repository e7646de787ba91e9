use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    error::{ApiError, ApiResult},
    models::Project,
    state::{
        AppState, create_project, delete_project, generate_common_fee_bills, get_project_by_id,
        list_projects, update_project,
    },
};

use super::{created, non_empty, parse_id};

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub default_currency: String,
    pub common_fee_rate: f64,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        ProjectView {
            id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: project.name,
            slug: project.slug,
            default_currency: project.default_currency,
            common_fee_rate: project.common_fee_rate,
            is_active: project.is_active,
            notes: project.notes,
        }
    }
}

#[derive(Deserialize)]
pub struct ProjectPayload {
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    default_currency: String,
    #[serde(default)]
    common_fee_rate: f64,
    #[serde(default = "super::default_true")]
    is_active: bool,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct CommonFeePayload {
    month: String,
}

pub async fn projects_index(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let projects = list_projects(&state).await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

pub async fn projects_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectView>> {
    let id = parse_id(&id)?;
    let project = get_project_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
    Ok(Json(project.into()))
}

pub async fn projects_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<impl IntoResponse> {
    let id = create_project(
        &state,
        &payload.name,
        &payload.slug,
        &payload.default_currency,
        payload.common_fee_rate,
        payload.is_active,
        non_empty(payload.notes),
    )
    .await?;
    Ok(created(id))
}

pub async fn projects_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    update_project(
        &state,
        &id,
        &payload.name,
        &payload.slug,
        &payload.default_currency,
        payload.common_fee_rate,
        payload.is_active,
        non_empty(payload.notes),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn projects_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    delete_project(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bills every unit of the project for one month.
pub async fn projects_bill_common_fees(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CommonFeePayload>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id)?;
    let run = generate_common_fee_bills(&state, &id, &payload.month).await?;
    Ok(Json(json!({
        "billing_month": run.billing_month,
        "created": run.created.iter().map(|id| id.to_hex()).collect::<Vec<_>>(),
        "skipped_units": run.skipped_units,
        "total_billed": run.total_billed,
    })))
}
