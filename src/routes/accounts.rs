use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{AccountType, ChartAccount},
    state::{
        AppState, create_account, delete_account, get_account_by_id, list_accounts,
        update_account,
    },
};

use super::{created, non_empty, parse_id};

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: String,
    pub account_code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_code: Option<String>,
    pub is_active: bool,
    pub description: Option<String>,
}

impl From<ChartAccount> for AccountView {
    fn from(account: ChartAccount) -> Self {
        AccountView {
            id: account.id.map(|id| id.to_hex()).unwrap_or_default(),
            account_code: account.account_code,
            name: account.name,
            account_type: account.account_type,
            parent_code: account.parent_code,
            is_active: account.is_active,
            description: account.description,
        }
    }
}

#[derive(Deserialize)]
pub struct AccountPayload {
    #[serde(default)]
    account_code: String,
    name: String,
    account_type: String,
    #[serde(default)]
    parent_code: Option<String>,
    #[serde(default = "super::default_true")]
    is_active: bool,
    #[serde(default)]
    description: Option<String>,
}

impl AccountPayload {
    fn account_type(&self) -> ApiResult<AccountType> {
        AccountType::parse(&self.account_type).ok_or_else(|| {
            ApiError::BadRequest(format!("unknown account type {}", self.account_type))
        })
    }
}

pub async fn accounts_index(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AccountView>>> {
    let accounts = list_accounts(&state).await?;
    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}

pub async fn accounts_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountView>> {
    let id = parse_id(&id)?;
    let account = get_account_by_id(&state, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("account {id} not found")))?;
    Ok(Json(account.into()))
}

pub async fn accounts_create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AccountPayload>,
) -> ApiResult<impl IntoResponse> {
    let account_type = payload.account_type()?;
    let id = create_account(
        &state,
        &payload.account_code,
        &payload.name,
        account_type,
        non_empty(payload.parent_code),
        payload.is_active,
        non_empty(payload.description),
    )
    .await?;
    Ok(created(id))
}

pub async fn accounts_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AccountPayload>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let account_type = payload.account_type()?;
    update_account(
        &state,
        &id,
        &payload.name,
        account_type,
        non_empty(payload.parent_code),
        payload.is_active,
        non_empty(payload.description),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accounts_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    delete_account(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
